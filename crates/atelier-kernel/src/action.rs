//! Named editor actions.
//!
//! Keyboard shortcuts and menus trigger actions by name. Actions take no
//! arguments: the studio reads whatever it needs (prompt text, editor buffer)
//! from its own editor state.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::ai::GenerateError;
use crate::patch::{ApplySummary, CodePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NewFile,
    Save,
    AiGenerate,
    ApplyPatch,
    RejectPatch,
    Undo,
    CancelGeneration,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::NewFile,
        Action::Save,
        Action::AiGenerate,
        Action::ApplyPatch,
        Action::RejectPatch,
        Action::Undo,
        Action::CancelGeneration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::NewFile => "new-file",
            Action::Save => "save",
            Action::AiGenerate => "ai-generate",
            Action::ApplyPatch => "apply",
            Action::RejectPatch => "reject",
            Action::Undo => "undo",
            Action::CancelGeneration => "cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Result of submitting the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Prompt was blank; nothing was sent.
    EmptyPrompt,
    /// The service proposed a patch; it is held for review.
    PatchReady(CodePatch),
    /// The request failed; the prompt is kept for editing.
    Failed(GenerateError),
    /// The request was overtaken by a newer one and its result dropped.
    Superseded,
}

/// What dispatching an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    FileCreated(String),
    /// Path written from the editor buffer, or `None` when there was nothing
    /// to save.
    Saved(Option<String>),
    Submitted(SubmitOutcome),
    Applied(ApplySummary),
    Rejected,
    Undone,
    /// Whether a request was actually in flight.
    Cancelled(bool),
}
