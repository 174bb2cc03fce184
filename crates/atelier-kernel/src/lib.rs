//! atelier-kernel: the core of the atelier code studio.
//!
//! This crate provides:
//!
//! - **VFS**: An in-memory workspace of text files with a derived folder tree
//! - **Patch**: The AI patch format, its application, and diff previews
//! - **Assist**: The request → review → apply/reject cycle with one level of undo
//! - **AI**: The code generation client (HTTP, or scripted for tests)
//! - **State**: Workspace persistence (in memory, or JSON files under XDG dirs)
//! - **Studio**: The coordinator tying all of the above together
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use atelier_kernel::{Studio, StudioConfig};
//!
//! let studio = Studio::from_config(StudioConfig::transient()).await?;
//! studio.create_file("src/utils/math.ts", "export const add = (a, b) => a + b;").await;
//! println!("{}", atelier_kernel::vfs::render_tree(&studio.tree().await));
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod ai;
pub mod config;
pub mod notice;
pub mod patch;
pub mod session;
pub mod state;
pub mod studio;
pub mod vfs;

pub use action::{Action, ActionOutcome, SubmitOutcome, UnknownAction};
pub use ai::{CodeGenerator, GenerateError, GenerateRequest, HttpGenerator, ScriptedGenerator};
pub use config::StudioConfig;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use patch::{ApplySummary, CodePatch, FileDiff, Operation};
pub use session::{AssistSession, AssistState, SessionError};
pub use state::{JsonFileStore, MemoryStore, WorkspaceStore};
pub use studio::{EditorState, Studio};
pub use vfs::{File, FileNode, Workspace};
