//! Patch model: a plan plus an ordered list of file operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single file operation proposed by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// Create or overwrite a file.
    Write { path: String, content: String },
    /// Remove a file.
    Delete { path: String },
    /// Move a file; content is preserved.
    Rename {
        path: String,
        #[serde(rename = "newPath")]
        new_path: String,
    },
}

impl Operation {
    /// The path this operation reads from.
    pub fn path(&self) -> &str {
        match self {
            Operation::Write { path, .. }
            | Operation::Delete { path }
            | Operation::Rename { path, .. } => path,
        }
    }

    /// Short verb for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Write { .. } => "write",
            Operation::Delete { .. } => "delete",
            Operation::Rename { .. } => "rename",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Write { path, content } => {
                write!(f, "write {} ({} bytes)", path, content.len())
            }
            Operation::Delete { path } => write!(f, "delete {}", path),
            Operation::Rename { path, new_path } => write!(f, "rename {} -> {}", path, new_path),
        }
    }
}

/// A proposed change set.
///
/// Operations apply in list order; a later operation may reference a path
/// written or renamed by an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePatch {
    /// Human-readable description of intent.
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl CodePatch {
    /// Create an empty patch with a plan.
    pub fn new(plan: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            operations: Vec::new(),
        }
    }

    pub fn write(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.operations.push(Operation::Write {
            path: path.into(),
            content: content.into(),
        });
        self
    }

    pub fn delete(mut self, path: impl Into<String>) -> Self {
        self.operations.push(Operation::Delete { path: path.into() });
        self
    }

    pub fn rename(mut self, path: impl Into<String>, new_path: impl Into<String>) -> Self {
        self.operations.push(Operation::Rename {
            path: path.into(),
            new_path: new_path.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
