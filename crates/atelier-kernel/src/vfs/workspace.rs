//! The workspace: a named, ordered, path-unique set of text files.
//!
//! Every mutator here is total. Writes upsert, deletes of missing paths are
//! no-ops, and renames onto an occupied path are dropped. Patch application
//! relies on this: a stale or redundant operation never aborts the patch.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::path::normalize;

/// A single text file owned by a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Normalized slash-delimited path. Also encodes the folder hierarchy.
    pub path: String,
    /// Text payload.
    pub content: String,
}

impl File {
    /// Create a file entry. The path is taken as-is; use the workspace
    /// mutators to get normalization.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// An in-memory project.
///
/// Serializes as `{ id, name, files: [{path, content}], activeFile }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    files: Vec<File>,
    #[serde(default)]
    active_file: Option<String>,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            files: Vec::new(),
            active_file: None,
        }
    }

    /// The starter project a fresh workspace is seeded with.
    pub fn scaffold(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut ws = Self::new(id, name);
        ws.create_file(
            "src/App.tsx",
            "export default function App() {\n  return <main>Hello from atelier</main>;\n}\n",
        );
        ws.create_file(
            "src/index.ts",
            "import App from './App';\n\nexport { App };\n",
        );
        ws.create_file("README.md", "# My Project\n\nDescribe what you want to build.\n");
        ws.set_active_file("src/App.tsx");
        ws
    }

    /// Rebuild a workspace from untrusted parts (persisted data, wire input).
    ///
    /// Paths are normalized, invalid paths dropped, duplicates collapsed with
    /// the later entry's content winning, and a dangling active pointer cleared.
    pub fn from_parts(
        id: impl Into<String>,
        name: impl Into<String>,
        files: impl IntoIterator<Item = File>,
        active_file: Option<String>,
    ) -> Self {
        let mut ws = Self::new(id, name);
        for file in files {
            ws.create_file(&file.path, file.content);
        }
        if let Some(active) = active_file {
            ws.set_active_file(&active);
        }
        ws
    }

    /// Re-run the invariants over this workspace. Used after deserialization.
    pub fn sanitized(self) -> Self {
        Self::from_parts(self.id, self.name, self.files, self.active_file)
    }

    /// Files in workspace order.
    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Path of the currently open file, if any.
    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the workspace holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a file by path.
    pub fn file(&self, path: &str) -> Option<&File> {
        let path = normalize(path)?;
        self.position(&path).map(|i| &self.files[i])
    }

    /// Check if a file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.file(path).is_some()
    }

    /// Content at `path`, or an empty string when there is no such file.
    pub fn file_content(&self, path: &str) -> String {
        self.file(path).map(|f| f.content.clone()).unwrap_or_default()
    }

    /// Insert a file, or overwrite its content if the path is taken.
    ///
    /// Returns `false` only when `path` normalizes to nothing.
    pub fn create_file(&mut self, path: &str, content: impl Into<String>) -> bool {
        let Some(path) = normalize(path) else {
            warn!(path, "ignoring write to invalid workspace path");
            return false;
        };
        let content = content.into();
        match self.position(&path) {
            Some(i) => {
                debug!(path = %path, "overwriting file");
                self.files[i].content = content;
            }
            None => {
                debug!(path = %path, "creating file");
                self.files.push(File { path, content });
            }
        }
        true
    }

    /// Replace the content of an existing file. Creates the file when missing.
    pub fn update_file_content(&mut self, path: &str, content: impl Into<String>) -> bool {
        if !self.contains(path) {
            debug!(path, "update of missing file, creating it");
        }
        self.create_file(path, content)
    }

    /// Remove a file. Returns `false` if there was nothing to remove.
    ///
    /// Clears the active pointer when it referenced the removed file.
    pub fn delete_file(&mut self, path: &str) -> bool {
        let Some(path) = normalize(path) else {
            return false;
        };
        let Some(i) = self.position(&path) else {
            debug!(path = %path, "delete of missing file ignored");
            return false;
        };
        self.files.remove(i);
        if self.active_file.as_deref() == Some(path.as_str()) {
            self.active_file = None;
        }
        debug!(path = %path, "deleted file");
        true
    }

    /// Move a file to `new_path`, keeping its content and its place in the
    /// file order.
    ///
    /// Dropped (returns `false`) when the source is missing, the destination
    /// is occupied, or either path is invalid. The active pointer follows the
    /// file.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        let (Some(from), Some(to)) = (normalize(old_path), normalize(new_path)) else {
            warn!(old_path, new_path, "ignoring rename with invalid path");
            return false;
        };
        let Some(i) = self.position(&from) else {
            debug!(from = %from, "rename of missing file ignored");
            return false;
        };
        if self.position(&to).is_some() {
            debug!(from = %from, to = %to, "rename target occupied, dropped");
            return false;
        }
        if self.active_file.as_deref() == Some(from.as_str()) {
            self.active_file = Some(to.clone());
        }
        debug!(from = %from, to = %to, "renamed file");
        self.files[i].path = to;
        true
    }

    /// Point the editor at `path`. Only existing files can be opened.
    pub fn set_active_file(&mut self, path: &str) -> bool {
        match normalize(path) {
            Some(path) if self.position(&path).is_some() => {
                self.active_file = Some(path);
                true
            }
            _ => false,
        }
    }

    fn position(&self, normalized: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == normalized)
    }
}
