//! The Studio: owns and coordinates one editing session.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Studio                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │  Workspace   │  │   UndoSlot   │  │   AssistSession    │  │
//! │  │  (files,     │  │  (one pre-   │  │ (idle/requesting/  │  │
//! │  │   active)    │  │   apply copy)│  │   patch-ready)     │  │
//! │  └──────────────┘  └──────────────┘  └────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │ EditorState  │  │ NoticeBoard  │  │ WorkspaceStore /   │  │
//! │  │ (prompt,     │  │ (toasts)     │  │ CodeGenerator      │  │
//! │  │  buffer)     │  │              │  │ (collaborators)    │  │
//! │  └──────────────┘  └──────────────┘  └────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Construct one per session and share it by reference. Every mutation runs
//! under a single write lock against the current workspace and is persisted
//! before the lock is released, so saves land in mutation order. The only
//! await that happens outside the lock is the generation request.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::{Action, ActionOutcome, SubmitOutcome};
use crate::ai::{CodeGenerator, GenerateError, GenerateRequest};
use crate::config::StudioConfig;
use crate::notice::{Notice, NoticeBoard};
use crate::patch::{self, ApplySummary, CodePatch, FileDiff, UndoSlot};
use crate::session::{AssistSession, AssistState, Resolution, SessionError};
use crate::state::WorkspaceStore;
use crate::vfs::{build_file_tree, FileNode, Workspace};

/// Text the user is editing but has not committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    /// Draft prompt for the assistant.
    pub prompt: String,
    /// Unsaved content for the active file.
    pub buffer: Option<String>,
}

struct StudioState {
    workspace: Workspace,
    undo: UndoSlot,
    session: AssistSession,
    editor: EditorState,
    notices: NoticeBoard,
    in_flight: Option<InFlight>,
}

/// The outstanding generation request.
struct InFlight {
    request: u64,
    token: CancellationToken,
}

impl StudioState {
    /// Settle `request` as cancelled if it is still the one in flight.
    fn release(&mut self, request: u64) -> bool {
        if self.in_flight.as_ref().is_some_and(|f| f.request == request) {
            self.in_flight = None;
        }
        self.session.abort(request)
    }

    /// Settle a request whose submitter was dropped before it could.
    fn reclaim_abandoned(&mut self) {
        let abandoned = self
            .in_flight
            .as_ref()
            .filter(|f| f.token.is_cancelled())
            .map(|f| f.request);
        if let Some(request) = abandoned {
            debug!(request, "reclaiming abandoned generation request");
            self.release(request);
        }
    }
}

/// Cancels and settles the request when a submit future is dropped early.
///
/// `Drop` cannot wait for the lock. When it is contended the token is still
/// cancelled and the next submit or cancel reclaims the request.
struct RequestGuard<'a> {
    state: &'a RwLock<StudioState>,
    request: u64,
    token: CancellationToken,
    armed: bool,
}

impl RequestGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.token.cancel();
        match self.state.try_write() {
            Ok(mut state) => {
                if state.release(self.request) {
                    info!(request = self.request, "generation abandoned");
                    state.notices.info("Generation cancelled", "");
                }
            }
            Err(_) => debug!(request = self.request, "generation abandoned, lock busy"),
        }
    }
}

/// One workspace editing session with AI assistance.
pub struct Studio {
    config: StudioConfig,
    state: RwLock<StudioState>,
    store: Arc<dyn WorkspaceStore>,
    generator: Arc<dyn CodeGenerator>,
}

impl Studio {
    /// Open the configured workspace, scaffolding it on first use.
    pub async fn open(
        config: StudioConfig,
        store: Arc<dyn WorkspaceStore>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Result<Self> {
        let loaded = store
            .load(&config.workspace_id)
            .await
            .with_context(|| format!("loading workspace {}", config.workspace_id))?;

        let (workspace, fresh) = match loaded {
            Some(ws) => {
                info!(id = %ws.id, files = ws.len(), "opened workspace");
                (ws, false)
            }
            None => {
                info!(id = %config.workspace_id, "scaffolding new workspace");
                (
                    Workspace::scaffold(&config.workspace_id, &config.workspace_name),
                    true,
                )
            }
        };

        let studio = Self {
            config,
            state: RwLock::new(StudioState {
                workspace,
                undo: UndoSlot::new(),
                session: AssistSession::new(),
                editor: EditorState::default(),
                notices: NoticeBoard::default(),
                in_flight: None,
            }),
            store,
            generator,
        };

        if fresh {
            let mut state = studio.state.write().await;
            studio.persist(&mut state).await;
        }
        Ok(studio)
    }

    /// Open using the store and generator the config describes.
    pub async fn from_config(config: StudioConfig) -> Result<Self> {
        let store = config.build_store();
        let generator = config
            .build_generator()
            .context("setting up code generation")?;
        Self::open(config, store, generator).await
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    // ================================================================
    // Reads
    // ================================================================

    /// Copy of the current workspace.
    pub async fn workspace(&self) -> Workspace {
        self.state.read().await.workspace.clone()
    }

    /// Folder/file tree, derived fresh from the file list.
    pub async fn tree(&self) -> Vec<FileNode> {
        build_file_tree(self.state.read().await.workspace.files())
    }

    /// Content at `path`, empty when there is no such file.
    pub async fn file_content(&self, path: &str) -> String {
        self.state.read().await.workspace.file_content(path)
    }

    pub async fn active_file(&self) -> Option<String> {
        self.state
            .read()
            .await
            .workspace
            .active_file()
            .map(str::to_string)
    }

    pub async fn editor(&self) -> EditorState {
        self.state.read().await.editor.clone()
    }

    pub async fn assist_state(&self) -> AssistState {
        self.state.read().await.session.state().clone()
    }

    pub async fn is_generating(&self) -> bool {
        self.state.read().await.session.is_in_flight()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .last_error()
            .map(str::to_string)
    }

    pub async fn pending_patch(&self) -> Option<CodePatch> {
        self.state.read().await.session.pending_patch().cloned()
    }

    /// Diff preview of the pending patch against the current workspace.
    pub async fn preview(&self) -> Option<Vec<FileDiff>> {
        let state = self.state.read().await;
        let patch = state.session.pending_patch()?;
        Some(patch::preview(&state.workspace, patch))
    }

    pub async fn can_undo(&self) -> bool {
        !self.state.read().await.undo.is_empty()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.state.read().await.notices.list()
    }

    pub async fn take_notices(&self) -> Vec<Notice> {
        self.state.write().await.notices.drain()
    }

    pub async fn dismiss_notice(&self, id: u64) -> bool {
        self.state.write().await.notices.dismiss(id)
    }

    // ================================================================
    // File operations
    // ================================================================

    /// Create a file, or overwrite it if it exists.
    pub async fn create_file(&self, path: &str, content: &str) -> bool {
        self.mutate(|ws| ws.create_file(path, content)).await
    }

    /// Replace a file's content, creating it when missing.
    pub async fn update_file(&self, path: &str, content: &str) -> bool {
        self.mutate(|ws| ws.update_file_content(path, content)).await
    }

    /// Delete a file; a no-op when it does not exist.
    pub async fn delete_file(&self, path: &str) -> bool {
        self.mutate(|ws| ws.delete_file(path)).await
    }

    /// Rename a file; dropped when the source is missing or the target taken.
    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> bool {
        self.mutate(|ws| ws.rename_file(old_path, new_path)).await
    }

    /// Make `path` the active file. Discards any unsaved buffer.
    pub async fn open_file(&self, path: &str) -> bool {
        self.mutate(|ws| ws.set_active_file(path)).await
    }

    /// Create `untitled.txt` (or the first free `untitled-N.txt`) and open it.
    pub async fn new_file(&self) -> String {
        let mut state = self.state.write().await;
        let path = untitled_path(&state.workspace);
        state.workspace.create_file(&path, "");
        state.workspace.set_active_file(&path);
        state.editor.buffer = None;
        debug!(path = %path, "new file");
        self.persist(&mut state).await;
        path
    }

    /// Hold unsaved content for the active file. Ignored when nothing is open.
    pub async fn set_buffer(&self, content: impl Into<String>) -> bool {
        let mut state = self.state.write().await;
        if state.workspace.active_file().is_none() {
            return false;
        }
        state.editor.buffer = Some(content.into());
        true
    }

    /// Write the editor buffer into the active file.
    ///
    /// Returns the saved path, or `None` when there was nothing to save.
    pub async fn save(&self) -> Option<String> {
        let mut state = self.state.write().await;
        let path = state.workspace.active_file()?.to_string();
        let content = state.editor.buffer.take()?;
        state.workspace.update_file_content(&path, content);
        state.notices.success("Saved", path.clone());
        self.persist(&mut state).await;
        Some(path)
    }

    // ================================================================
    // Assistant
    // ================================================================

    /// Replace the draft prompt.
    pub async fn set_prompt(&self, prompt: impl Into<String>) {
        self.state.write().await.editor.prompt = prompt.into();
    }

    /// Set the prompt and submit it.
    pub async fn generate(&self, prompt: impl Into<String>) -> Result<SubmitOutcome, SessionError> {
        self.set_prompt(prompt).await;
        self.submit().await
    }

    /// Send the current prompt and the workspace to the generator.
    ///
    /// A blank prompt is refused without any request. Only one request may be
    /// in flight; it is bounded by the configured timeout and can be stopped
    /// with [`cancel_generation`](Self::cancel_generation). Dropping the
    /// returned future cancels the request and returns the session to idle.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let (request_id, request, token) = {
            let mut state = self.state.write().await;
            state.reclaim_abandoned();
            let prompt = state.editor.prompt.clone();
            let Some(request_id) = state.session.begin(&prompt)? else {
                debug!("blank prompt, nothing to submit");
                return Ok(SubmitOutcome::EmptyPrompt);
            };
            let token = CancellationToken::new();
            state.in_flight = Some(InFlight {
                request: request_id,
                token: token.clone(),
            });
            let request = GenerateRequest {
                prompt: prompt.trim().to_string(),
                files: state.workspace.files().to_vec(),
                active_file_path: state.workspace.active_file().map(str::to_string),
            };
            (request_id, request, token)
        };
        let guard = RequestGuard {
            state: &self.state,
            request: request_id,
            token: token.clone(),
            armed: true,
        };

        info!(
            request = request_id,
            prompt_len = request.prompt.len(),
            files = request.files.len(),
            "generation requested"
        );

        let timeout = self.config.timeout();
        let outcome = tokio::select! {
            _ = token.cancelled() => Err(GenerateError::Cancelled),
            result = tokio::time::timeout(timeout, self.generator.generate(&request)) => {
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(GenerateError::Timeout(timeout)),
                }
            }
        };

        let mut state = self.state.write().await;
        guard.disarm();
        let resolution = match &outcome {
            Ok(patch) => state.session.resolve(request_id, Ok(patch.clone())),
            Err(e) => state.session.resolve(request_id, Err(e.to_string())),
        };
        if resolution != Resolution::Stale {
            state.in_flight = None;
        }

        Ok(match (resolution, outcome) {
            (Resolution::Stale, Err(GenerateError::Cancelled)) => {
                debug!(request = request_id, "generation was cancelled");
                SubmitOutcome::Failed(GenerateError::Cancelled)
            }
            (Resolution::Stale, _) => {
                debug!(request = request_id, "dropping superseded generation result");
                SubmitOutcome::Superseded
            }
            (_, Ok(patch)) => {
                info!(request = request_id, operations = patch.len(), "patch ready");
                let description = if patch.plan.is_empty() {
                    format!("{} operation(s) to review", patch.len())
                } else {
                    patch.plan.clone()
                };
                state.notices.info("Patch ready", description);
                SubmitOutcome::PatchReady(patch)
            }
            (_, Err(GenerateError::Cancelled)) => {
                info!(request = request_id, "generation cancelled");
                state.notices.info("Generation cancelled", "");
                SubmitOutcome::Failed(GenerateError::Cancelled)
            }
            (_, Err(e)) => {
                warn!(request = request_id, error = %e, "generation failed");
                state.notices.error("Generation failed", e.to_string());
                SubmitOutcome::Failed(e)
            }
        })
    }

    /// Stop the in-flight request, if any, and return the session to idle.
    ///
    /// The prompt is kept. The pending [`submit`](Self::submit) returns
    /// [`GenerateError::Cancelled`] once it wakes.
    pub async fn cancel_generation(&self) -> bool {
        let mut state = self.state.write().await;
        let Some(InFlight { request, token }) = state.in_flight.take() else {
            return false;
        };
        info!(request, "cancelling generation");
        token.cancel();
        if !state.session.abort(request) {
            return false;
        }
        state.notices.info("Generation cancelled", "");
        true
    }

    /// Commit the pending patch.
    ///
    /// The pre-apply workspace is kept for one level of undo, replacing any
    /// earlier snapshot. Clears the prompt.
    pub async fn apply_patch(&self) -> Result<ApplySummary, SessionError> {
        let mut state = self.state.write().await;
        let patch = state.session.take_for_apply()?;

        let (next, summary) = patch::apply(&state.workspace, &patch);
        let previous = std::mem::replace(&mut state.workspace, next);
        if active_view_changed(&previous, &state.workspace) {
            state.editor.buffer = None;
        }
        state.undo.store(previous);
        state.editor.prompt.clear();

        info!(%summary, "patch applied");
        state.notices.success("Patch applied", summary.to_string());
        self.persist(&mut state).await;
        Ok(summary)
    }

    /// Discard the pending patch. The prompt stays for editing.
    pub async fn reject_patch(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let prompt = state.session.reject()?;
        info!(prompt_len = prompt.len(), "patch rejected");
        state.notices.info("Patch discarded", "");
        Ok(())
    }

    /// Restore the workspace as it was before the last apply.
    pub async fn undo(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let snapshot = state.undo.take().ok_or(SessionError::NothingToUndo)?;
        state.workspace = snapshot;
        state.editor.buffer = None;
        info!("restored pre-apply workspace");
        state.notices.info("Undone", "Workspace restored");
        self.persist(&mut state).await;
        Ok(())
    }

    // ================================================================
    // Actions
    // ================================================================

    /// Run a named action against the current editor state.
    pub async fn dispatch(&self, action: Action) -> Result<ActionOutcome, SessionError> {
        debug!(%action, "dispatch");
        Ok(match action {
            Action::NewFile => ActionOutcome::FileCreated(self.new_file().await),
            Action::Save => ActionOutcome::Saved(self.save().await),
            Action::AiGenerate => ActionOutcome::Submitted(self.submit().await?),
            Action::ApplyPatch => ActionOutcome::Applied(self.apply_patch().await?),
            Action::RejectPatch => {
                self.reject_patch().await?;
                ActionOutcome::Rejected
            }
            Action::Undo => {
                self.undo().await?;
                ActionOutcome::Undone
            }
            Action::CancelGeneration => ActionOutcome::Cancelled(self.cancel_generation().await),
        })
    }

    // ================================================================
    // Internals
    // ================================================================

    /// Apply `f` to the live workspace and persist if it reports a change.
    async fn mutate(&self, f: impl FnOnce(&mut Workspace) -> bool) -> bool {
        let mut state = self.state.write().await;
        let before = active_view(&state.workspace);
        let changed = f(&mut state.workspace);
        if changed {
            if active_view(&state.workspace) != before {
                state.editor.buffer = None;
            }
            self.persist(&mut state).await;
        }
        changed
    }

    /// Save the workspace. Failures are reported, never fatal.
    async fn persist(&self, state: &mut StudioState) {
        if let Err(e) = self.store.save(&state.workspace).await {
            warn!(id = %state.workspace.id, error = %e, "failed to save workspace");
            state.notices.error("Save failed", format!("{e:#}"));
        }
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("workspace_id", &self.config.workspace_id)
            .finish_non_exhaustive()
    }
}

/// First free name among `untitled.txt`, `untitled-1.txt`, `untitled-2.txt`, ...
fn untitled_path(workspace: &Workspace) -> String {
    if !workspace.contains("untitled.txt") {
        return "untitled.txt".to_string();
    }
    (1..)
        .map(|n| format!("untitled-{n}.txt"))
        .find(|p| !workspace.contains(p))
        .unwrap_or_else(|| "untitled.txt".to_string())
}

/// The active file's path and content, the part of the workspace an unsaved
/// buffer is written against.
fn active_view(workspace: &Workspace) -> Option<(String, String)> {
    let path = workspace.active_file()?;
    Some((path.to_string(), workspace.file_content(path)))
}

/// Did the active file's identity or content change between two workspaces?
fn active_view_changed(before: &Workspace, after: &Workspace) -> bool {
    active_view(before) != active_view(after)
}
