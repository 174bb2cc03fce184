//! Assist session: the request → review → apply/reject cycle.
//!
//! ```text
//!            begin(prompt)              resolve(Ok)
//!   Idle ───────────────▶ Requesting ──────────────▶ PatchReady
//!    ▲                        │                        │    │
//!    │  resolve(Err) / abort  │                        │    │
//!    ├────────────────────────┘        take_for_apply  │    │ reject
//!    ├─────────────────────────────────────────────────┘    │
//!    └──────────────────────────────────────────────────────┘
//! ```
//!
//! The session only tracks state. The studio performs the request, applies
//! patches and owns the prompt text.

use thiserror::Error;

use crate::patch::CodePatch;

/// Misuse of the assist session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("a patch is waiting for review; apply or reject it first")]
    PatchPending,
    #[error("no patch is ready")]
    NoPatchReady,
    #[error("nothing to undo")]
    NothingToUndo,
}

/// Where the session is in its cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssistState {
    #[default]
    Idle,
    Requesting {
        prompt: String,
        request: u64,
    },
    PatchReady {
        prompt: String,
        patch: CodePatch,
    },
}

impl AssistState {
    pub fn name(&self) -> &'static str {
        match self {
            AssistState::Idle => "idle",
            AssistState::Requesting { .. } => "requesting",
            AssistState::PatchReady { .. } => "patch-ready",
        }
    }
}

/// Result of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Patch held for review.
    Ready,
    /// Request failed; session is idle again.
    Failed,
    /// The request id did not match the in-flight one; nothing changed.
    Stale,
}

/// Per-session state machine.
#[derive(Debug, Default)]
pub struct AssistSession {
    state: AssistState,
    last_error: Option<String>,
    next_request: u64,
}

impl AssistSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AssistState {
        &self.state
    }

    /// True while a request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, AssistState::Requesting { .. })
    }

    /// Error message from the most recent failed request.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The patch awaiting review, if any.
    pub fn pending_patch(&self) -> Option<&CodePatch> {
        match &self.state {
            AssistState::PatchReady { patch, .. } => Some(patch),
            _ => None,
        }
    }

    /// Start a request for `prompt`.
    ///
    /// Returns `Ok(None)` without any transition when the prompt is blank,
    /// otherwise the id the eventual [`resolve`](Self::resolve) must carry.
    pub fn begin(&mut self, prompt: &str) -> Result<Option<u64>, SessionError> {
        match self.state {
            AssistState::Requesting { .. } => return Err(SessionError::Busy),
            AssistState::PatchReady { .. } => return Err(SessionError::PatchPending),
            AssistState::Idle => {}
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        self.next_request += 1;
        let request = self.next_request;
        self.last_error = None;
        self.state = AssistState::Requesting {
            prompt: prompt.to_string(),
            request,
        };
        Ok(Some(request))
    }

    /// Settle the in-flight request.
    pub fn resolve(&mut self, request: u64, outcome: Result<CodePatch, String>) -> Resolution {
        let prompt = match &self.state {
            AssistState::Requesting {
                prompt,
                request: current,
            } if *current == request => prompt.clone(),
            _ => return Resolution::Stale,
        };

        match outcome {
            Ok(patch) => {
                self.state = AssistState::PatchReady { prompt, patch };
                Resolution::Ready
            }
            Err(message) => {
                self.last_error = Some(message);
                self.state = AssistState::Idle;
                Resolution::Failed
            }
        }
    }

    /// Give up on the in-flight request and return to idle.
    ///
    /// Returns `false` when `request` is not the one in flight. A later
    /// [`resolve`](Self::resolve) for the same id is then stale.
    pub fn abort(&mut self, request: u64) -> bool {
        self.resolve(request, Err("cancelled".to_string())) == Resolution::Failed
    }

    /// Hand the ready patch over for application and return to idle.
    pub fn take_for_apply(&mut self) -> Result<CodePatch, SessionError> {
        match std::mem::take(&mut self.state) {
            AssistState::PatchReady { patch, .. } => Ok(patch),
            other => {
                self.state = other;
                Err(SessionError::NoPatchReady)
            }
        }
    }

    /// Discard the ready patch and return to idle. Returns the prompt it was
    /// generated from.
    pub fn reject(&mut self) -> Result<String, SessionError> {
        match std::mem::take(&mut self.state) {
            AssistState::PatchReady { prompt, .. } => Ok(prompt),
            other => {
                self.state = other;
                Err(SessionError::NoPatchReady)
            }
        }
    }
}
