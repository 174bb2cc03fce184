//! Code patches proposed by the generation service.
//!
//! - [`model`]: the `CodePatch` / `Operation` data types (also the wire format)
//! - [`engine`]: sequential application and the single-slot undo snapshot
//! - [`diff`]: per-operation unified diff previews

pub mod diff;
pub mod engine;
pub mod model;

pub use diff::{preview, Change, FileDiff};
pub use engine::{apply, ApplySummary, UndoSlot};
pub use model::{CodePatch, Operation};
