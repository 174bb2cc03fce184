//! End-to-end studio flows with a scripted generator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use atelier_kernel::notice::NoticeLevel;
use atelier_kernel::{
    Action, ActionOutcome, AssistState, CodePatch, GenerateError, JsonFileStore, MemoryStore,
    ScriptedGenerator, SessionError, Studio, StudioConfig, SubmitOutcome, Workspace,
    WorkspaceStore,
};

async fn open(generator: Arc<ScriptedGenerator>) -> Studio {
    Studio::open(StudioConfig::transient(), Arc::new(MemoryStore::new()), generator)
        .await
        .expect("open studio")
}

fn add_button() -> CodePatch {
    CodePatch::new("Add a button component")
        .write("src/components/Button.tsx", "export const Button = () => null;")
        .write("src/App.tsx", "import { Button } from './components/Button';")
}

#[tokio::test]
async fn empty_prompt_sends_nothing() {
    let generator = Arc::new(ScriptedGenerator::new().with_patch(add_button()));
    let studio = open(generator.clone()).await;

    assert_eq!(studio.generate("").await, Ok(SubmitOutcome::EmptyPrompt));
    assert_eq!(studio.generate("   ").await, Ok(SubmitOutcome::EmptyPrompt));

    assert!(generator.requests().await.is_empty());
    assert_eq!(studio.assist_state().await, AssistState::Idle);
}

#[tokio::test]
async fn request_carries_workspace_and_active_file() {
    let generator = Arc::new(ScriptedGenerator::new().with_patch(add_button()));
    let studio = open(generator.clone()).await;

    studio.generate("  add a button  ").await.unwrap();

    let requests = generator.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "add a button");
    assert_eq!(requests[0].files, studio.workspace().await.files());
    assert_eq!(requests[0].active_file_path.as_deref(), Some("src/App.tsx"));
}

#[tokio::test]
async fn apply_then_undo_round_trips() {
    let studio = open(Arc::new(ScriptedGenerator::new().with_patch(add_button()))).await;
    let before = studio.workspace().await;

    let outcome = studio.generate("add a button").await.unwrap();
    assert_eq!(outcome, SubmitOutcome::PatchReady(add_button()));
    assert!(studio.preview().await.is_some());

    let summary = studio.apply_patch().await.unwrap();
    assert_eq!(summary.written, 2);
    assert!(studio.workspace().await.contains("src/components/Button.tsx"));
    assert!(studio.can_undo().await);

    studio.undo().await.unwrap();
    assert_eq!(studio.workspace().await, before);
    assert!(!studio.can_undo().await);
    assert_eq!(studio.undo().await, Err(SessionError::NothingToUndo));
}

#[tokio::test]
async fn undo_only_reverts_latest_apply() {
    let generator = ScriptedGenerator::new()
        .with_patch(CodePatch::new("a").write("a.ts", "a"))
        .with_patch(CodePatch::new("b").write("b.ts", "b"));
    let studio = open(Arc::new(generator)).await;

    studio.generate("a").await.unwrap();
    studio.apply_patch().await.unwrap();
    let after_a = studio.workspace().await;

    studio.generate("b").await.unwrap();
    studio.apply_patch().await.unwrap();
    studio.undo().await.unwrap();

    assert_eq!(studio.workspace().await, after_a);
}

#[tokio::test]
async fn reject_leaves_workspace_alone() {
    let studio = open(Arc::new(ScriptedGenerator::new().with_patch(add_button()))).await;
    let before = studio.workspace().await;

    studio.generate("add a button").await.unwrap();
    studio.reject_patch().await.unwrap();

    assert_eq!(studio.workspace().await, before);
    assert_eq!(studio.assist_state().await, AssistState::Idle);
    assert_eq!(studio.editor().await.prompt, "add a button");
    assert_eq!(studio.reject_patch().await, Err(SessionError::NoPatchReady));
}

#[tokio::test]
async fn pending_patch_blocks_new_request() {
    let generator = ScriptedGenerator::new()
        .with_patch(add_button())
        .with_patch(add_button());
    let studio = open(Arc::new(generator)).await;

    studio.generate("first").await.unwrap();
    assert_eq!(studio.generate("second").await, Err(SessionError::PatchPending));
    assert_eq!(studio.pending_patch().await, Some(add_button()));
}

#[tokio::test]
async fn failure_keeps_prompt_and_reports() {
    let generator =
        ScriptedGenerator::new().with_error(GenerateError::Service("model overloaded".into()));
    let studio = open(Arc::new(generator)).await;
    studio.take_notices().await;

    let outcome = studio.generate("add a button").await.unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Failed(GenerateError::Service("model overloaded".into()))
    );
    assert_eq!(studio.assist_state().await, AssistState::Idle);
    assert_eq!(studio.editor().await.prompt, "add a button");
    assert_eq!(studio.last_error().await.as_deref(), Some("model overloaded"));

    let notices = studio.take_notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Generation failed");
}

#[tokio::test]
async fn slow_generation_times_out() {
    let generator = ScriptedGenerator::new()
        .with_patch(add_button())
        .with_delay(Duration::from_secs(30));
    let mut config = StudioConfig::transient();
    config.generator.timeout_secs = 1;
    let studio = Studio::open(config, Arc::new(MemoryStore::new()), Arc::new(generator))
        .await
        .unwrap();

    let outcome = studio.generate("add a button").await.unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Failed(GenerateError::Timeout(Duration::from_secs(1)))
    );
    assert!(!studio.is_generating().await);
}

#[tokio::test]
async fn cancel_stops_in_flight_request() {
    let generator = ScriptedGenerator::new()
        .with_patch(add_button())
        .with_delay(Duration::from_secs(30));
    let studio = Arc::new(open(Arc::new(generator)).await);
    assert!(!studio.cancel_generation().await);

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.generate("add a button").await })
    };
    while !studio.is_generating().await {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(studio.generate("again").await, Err(SessionError::Busy));

    assert!(studio.cancel_generation().await);
    let outcome = task.await.unwrap().unwrap();

    assert_eq!(outcome, SubmitOutcome::Failed(GenerateError::Cancelled));
    assert_eq!(studio.assist_state().await, AssistState::Idle);
    assert!(!studio.workspace().await.contains("src/components/Button.tsx"));
}

#[tokio::test]
async fn dropped_request_frees_the_session() {
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_patch(add_button())
            .with_delay(Duration::from_millis(200)),
    );
    let studio = open(generator.clone()).await;

    let dropped = tokio::time::timeout(Duration::from_millis(20), studio.generate("add a")).await;
    assert!(dropped.is_err());
    assert_eq!(studio.assist_state().await, AssistState::Idle);
    assert!(!studio.cancel_generation().await);
    assert_eq!(studio.editor().await.prompt, "add a");

    tokio::time::sleep(Duration::from_millis(300)).await;
    let outcome = studio.generate("add a").await.unwrap();

    assert_eq!(outcome, SubmitOutcome::PatchReady(add_button()));
    assert_eq!(generator.requests().await.len(), 2);
}

#[tokio::test]
async fn cancel_settles_request_before_submitter_wakes() {
    let generator = ScriptedGenerator::new()
        .with_patch(add_button())
        .with_delay(Duration::from_secs(30));
    let studio = Arc::new(open(Arc::new(generator)).await);

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.generate("add a button").await })
    };
    while !studio.is_generating().await {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(studio.cancel_generation().await);
    assert_eq!(studio.assist_state().await, AssistState::Idle);
    assert_eq!(studio.last_error().await.as_deref(), Some("cancelled"));
    assert!(!studio.cancel_generation().await);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, SubmitOutcome::Failed(GenerateError::Cancelled));
    let cancelled = studio
        .notices()
        .await
        .into_iter()
        .filter(|n| n.title == "Generation cancelled")
        .count();
    assert_eq!(cancelled, 1);
}

#[tokio::test]
async fn workspace_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StudioConfig::default();
    config.workspace_id = "landing".into();
    config.data_dir = Some(dir.path().to_path_buf());

    {
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let generator = Arc::new(ScriptedGenerator::new().with_patch(add_button()));
        let studio = Studio::open(config.clone(), store, generator).await.unwrap();
        studio.create_file("notes.md", "remember").await;
        studio.generate("add a button").await.unwrap();
        studio.apply_patch().await.unwrap();
        studio.open_file("notes.md").await;
    }

    let studio = Studio::from_config(config).await.unwrap();
    let ws = studio.workspace().await;
    assert_eq!(ws.file_content("notes.md"), "remember");
    assert!(ws.contains("src/components/Button.tsx"));
    assert_eq!(ws.active_file(), Some("notes.md"));
    assert_eq!(ws.name, "My Project");
}

#[tokio::test]
async fn dispatch_runs_named_actions() {
    let studio = open(Arc::new(ScriptedGenerator::new().with_patch(add_button()))).await;

    studio.set_prompt("add a button").await;
    let outcome = studio.dispatch("ai-generate".parse::<Action>().unwrap()).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Submitted(SubmitOutcome::PatchReady(add_button()))
    );

    let outcome = studio.dispatch(Action::ApplyPatch).await.unwrap();
    assert!(matches!(outcome, ActionOutcome::Applied(s) if s.written == 2));
    assert_eq!(studio.dispatch(Action::Undo).await, Ok(ActionOutcome::Undone));
    assert_eq!(
        studio.dispatch(Action::RejectPatch).await,
        Err(SessionError::NoPatchReady)
    );
    assert_eq!(
        studio.dispatch(Action::CancelGeneration).await,
        Ok(ActionOutcome::Cancelled(false))
    );
    assert_eq!(
        studio.dispatch(Action::Save).await,
        Ok(ActionOutcome::Saved(None))
    );
}

struct BrokenStore;

#[async_trait]
impl WorkspaceStore for BrokenStore {
    async fn load(&self, _id: &str) -> Result<Option<Workspace>> {
        Ok(None)
    }

    async fn save(&self, _workspace: &Workspace) -> Result<()> {
        bail!("disk full")
    }
}

#[tokio::test]
async fn save_failures_are_reported_not_fatal() {
    let studio = Studio::open(
        StudioConfig::transient(),
        Arc::new(BrokenStore),
        Arc::new(ScriptedGenerator::new()),
    )
    .await
    .unwrap();

    assert!(studio.create_file("a.ts", "a").await);
    assert_eq!(studio.file_content("a.ts").await, "a");

    let notices = studio.take_notices().await;
    assert!(notices.len() >= 2);
    assert!(notices
        .iter()
        .all(|n| n.level == NoticeLevel::Error && n.title == "Save failed"));
    assert!(notices[0].description.contains("disk full"));
}
