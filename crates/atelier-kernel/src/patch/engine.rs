//! Patch application and the single-slot undo snapshot.

use std::fmt;

use tracing::debug;

use super::model::{CodePatch, Operation};
use crate::vfs::Workspace;

/// Counts of what a patch actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub written: usize,
    pub deleted: usize,
    pub renamed: usize,
    /// Operations that had no effect: deletes and renames of missing files,
    /// renames onto occupied paths, and operations naming invalid paths.
    pub skipped: usize,
}

impl ApplySummary {
    /// Operations that changed the workspace.
    pub fn applied(&self) -> usize {
        self.written + self.deleted + self.renamed
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} deleted, {} renamed",
            self.written, self.deleted, self.renamed
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Run every operation of `patch` against a copy of `workspace`, in order.
///
/// The input is untouched. Operations never fail; ones that cannot take
/// effect are counted as skipped and the rest still apply.
pub fn apply(workspace: &Workspace, patch: &CodePatch) -> (Workspace, ApplySummary) {
    let mut next = workspace.clone();
    let mut summary = ApplySummary::default();

    for op in &patch.operations {
        let applied = apply_op(&mut next, op);
        debug!(op = %op, applied, "patch operation");
        match (op, applied) {
            (_, false) => summary.skipped += 1,
            (Operation::Write { .. }, true) => summary.written += 1,
            (Operation::Delete { .. }, true) => summary.deleted += 1,
            (Operation::Rename { .. }, true) => summary.renamed += 1,
        }
    }

    (next, summary)
}

fn apply_op(workspace: &mut Workspace, op: &Operation) -> bool {
    match op {
        Operation::Write { path, content } => workspace.create_file(path, content.as_str()),
        Operation::Delete { path } => workspace.delete_file(path),
        Operation::Rename { path, new_path } => workspace.rename_file(path, new_path),
    }
}

/// Holds the workspace as it was right before the most recent apply.
///
/// One slot only: storing a new snapshot discards the previous one.
#[derive(Debug, Clone, Default)]
pub struct UndoSlot {
    snapshot: Option<Workspace>,
}

impl UndoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot.
    pub fn store(&mut self, snapshot: Workspace) {
        if self.snapshot.is_some() {
            debug!("discarding previous undo snapshot");
        }
        self.snapshot = Some(snapshot);
    }

    /// Take the snapshot out, leaving the slot empty.
    pub fn take(&mut self) -> Option<Workspace> {
        self.snapshot.take()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }
}
