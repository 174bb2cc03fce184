//! Patch previews: what each operation would do, as unified diffs.
//!
//! Operations are previewed in order against a scratch copy of the
//! workspace, so a write that follows a rename diffs against the renamed
//! file rather than the original tree.

use similar::{ChangeTag, TextDiff};

use super::model::{CodePatch, Operation};
use crate::vfs::{normalize, Workspace};

const CONTEXT_LINES: usize = 3;

/// How an operation changes its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added,
    Modified,
    /// A write whose content matches what is already there.
    Unchanged,
    Deleted,
    Renamed { from: String },
    /// The operation would have no effect.
    Skipped { reason: String },
}

/// Preview of a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path after the operation.
    pub path: String,
    pub change: Change,
    /// Unified diff text; empty for renames and skips.
    pub unified: String,
    pub insertions: usize,
    pub deletions: usize,
}

impl FileDiff {
    fn skipped(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            change: Change::Skipped {
                reason: reason.into(),
            },
            unified: String::new(),
            insertions: 0,
            deletions: 0,
        }
    }

    fn content(path: String, change: Change, old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        let (old_header, new_header) = match &change {
            Change::Added => ("/dev/null".to_string(), format!("b/{path}")),
            Change::Deleted => (format!("a/{path}"), "/dev/null".to_string()),
            _ => (format!("a/{path}"), format!("b/{path}")),
        };
        let unified = diff
            .unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(&old_header, &new_header)
            .to_string();

        let mut insertions = 0;
        let mut deletions = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => insertions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        Self {
            path,
            change,
            unified,
            insertions,
            deletions,
        }
    }

    /// One-line summary such as `M src/App.tsx (+3 -1)`.
    pub fn summary_line(&self) -> String {
        match &self.change {
            Change::Added => format!("A {} (+{})", self.path, self.insertions),
            Change::Modified => format!(
                "M {} (+{} -{})",
                self.path, self.insertions, self.deletions
            ),
            Change::Unchanged => format!("= {}", self.path),
            Change::Deleted => format!("D {} (-{})", self.path, self.deletions),
            Change::Renamed { from } => format!("R {} -> {}", from, self.path),
            Change::Skipped { reason } => format!("! {} ({})", self.path, reason),
        }
    }
}

/// Preview every operation of `patch` against `workspace`.
pub fn preview(workspace: &Workspace, patch: &CodePatch) -> Vec<FileDiff> {
    let mut scratch = workspace.clone();
    patch
        .operations
        .iter()
        .map(|op| preview_op(&mut scratch, op))
        .collect()
}

fn preview_op(scratch: &mut Workspace, op: &Operation) -> FileDiff {
    match op {
        Operation::Write { path, content } => {
            let Some(path) = normalize(path) else {
                return FileDiff::skipped(path, "invalid path");
            };
            let diff = match scratch.file(&path) {
                Some(existing) if existing.content == *content => FileDiff {
                    path: path.clone(),
                    change: Change::Unchanged,
                    unified: String::new(),
                    insertions: 0,
                    deletions: 0,
                },
                Some(existing) => {
                    let old = existing.content.clone();
                    FileDiff::content(path.clone(), Change::Modified, &old, content)
                }
                None => FileDiff::content(path.clone(), Change::Added, "", content),
            };
            scratch.create_file(&path, content.as_str());
            diff
        }
        Operation::Delete { path } => {
            let Some(path) = normalize(path) else {
                return FileDiff::skipped(path, "invalid path");
            };
            match scratch.file(&path).map(|f| f.content.clone()) {
                Some(old) => {
                    scratch.delete_file(&path);
                    FileDiff::content(path, Change::Deleted, &old, "")
                }
                None => FileDiff::skipped(&path, "no such file"),
            }
        }
        Operation::Rename { path, new_path } => {
            let (Some(from), Some(to)) = (normalize(path), normalize(new_path)) else {
                return FileDiff::skipped(path, "invalid path");
            };
            if !scratch.contains(&from) {
                return FileDiff::skipped(&from, "no such file");
            }
            if scratch.contains(&to) {
                return FileDiff::skipped(&to, format!("target exists, {from} not moved"));
            }
            scratch.rename_file(&from, &to);
            FileDiff {
                path: to,
                change: Change::Renamed { from },
                unified: String::new(),
                insertions: 0,
                deletions: 0,
            }
        }
    }
}
