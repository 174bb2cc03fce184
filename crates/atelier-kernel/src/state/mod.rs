//! Workspace persistence.
//!
//! The studio loads one workspace at start-up and saves the whole thing after
//! every mutation. Two stores are provided:
//!
//! - [`MemoryStore`]: process-local, for tests and `--transient` sessions
//! - [`JsonFileStore`]: one `{id}.json` per workspace, by default under
//!   `$XDG_DATA_HOME/atelier/workspaces/`
//!
//! Snapshots are the serialized [`Workspace`]; they are re-validated on load.

pub mod paths;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::vfs::Workspace;

/// Storage backend for workspaces.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Load a workspace by id. `Ok(None)` when it was never saved.
    async fn load(&self, id: &str) -> Result<Option<Workspace>>;

    /// Persist the full workspace, replacing any previous snapshot.
    async fn save(&self, workspace: &Workspace) -> Result<()>;
}

/// In-memory store. All data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<Workspace>> {
        Ok(self.workspaces.read().await.get(id).cloned())
    }

    async fn save(&self, workspace: &Workspace) -> Result<()> {
        self.workspaces
            .write()
            .await
            .insert(workspace.id.clone(), workspace.clone());
        Ok(())
    }
}

/// JSON file per workspace.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store snapshots under `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the XDG data directory.
    pub fn default_location() -> Self {
        Self::new(paths::workspaces_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the workspace `id`.
    ///
    /// Ids become file names, so only `[A-Za-z0-9._-]` is accepted and the
    /// names `.` and `..` are refused.
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            bail!("invalid workspace id: {id:?}");
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

#[async_trait]
impl WorkspaceStore for JsonFileStore {
    async fn load(&self, id: &str) -> Result<Option<Workspace>> {
        let path = self.path_for(id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("reading workspace: {}", path.display())));
            }
        };

        let workspace: Workspace = serde_json::from_str(&data)
            .with_context(|| format!("parsing workspace: {}", path.display()))?;
        debug!(id, path = %path.display(), files = workspace.len(), "loaded workspace");
        Ok(Some(workspace.sanitized()))
    }

    async fn save(&self, workspace: &Workspace) -> Result<()> {
        let path = self.path_for(&workspace.id)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating workspace directory: {}", self.root.display()))?;

        let data = serde_json::to_string_pretty(workspace).context("serializing workspace")?;

        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("writing workspace: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing workspace: {}", path.display()))?;

        debug!(id = %workspace.id, path = %path.display(), "saved workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workspace {
        let mut ws = Workspace::new("demo", "Demo");
        ws.create_file("src/App.tsx", "app");
        ws.create_file("README.md", "# hi\n");
        ws.set_active_file("src/App.tsx");
        ws
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("demo").await.unwrap().is_none());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load("demo").await.unwrap(), Some(sample()));

        let mut renamed = sample();
        renamed.name = "Renamed".into();
        store.save(&renamed).await.unwrap();
        assert_eq!(store.load("demo").await.unwrap(), Some(renamed));
        assert!(store.load("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("workspaces"));

        assert!(store.load("demo").await.unwrap().is_none());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load("demo").await.unwrap(), Some(sample()));

        // No temp file left behind
        assert!(!dir.path().join("workspaces/demo.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let mut ws = sample();
        store.save(&ws).await.unwrap();
        ws.delete_file("README.md");
        store.save(&ws).await.unwrap();

        let loaded = store.load("demo").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn test_file_snapshot_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save(&sample()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("demo.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["id"], "demo");
        assert_eq!(json["activeFile"], "src/App.tsx");
        assert_eq!(json["files"][1]["path"], "README.md");
    }

    #[tokio::test]
    async fn test_file_load_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            r#"{"id": "bad", "name": "Bad", "files": [{"path": "/x.ts", "content": ""}], "activeFile": "y.ts"}"#,
        )
        .unwrap();
        let store = JsonFileStore::new(dir.path());
        let ws = store.load("bad").await.unwrap().unwrap();
        assert!(ws.contains("x.ts"));
        assert_eq!(ws.files()[0].path, "x.ts");
        assert_eq!(ws.active_file(), None);
    }

    #[tokio::test]
    async fn test_file_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.load("broken").await.unwrap_err();
        assert!(err.to_string().contains("parsing workspace"));
    }

    #[test]
    fn test_invalid_ids() {
        let store = JsonFileStore::new("/tmp/ws");
        for id in ["", ".", "..", "../etc/passwd", "a/b", "a b"] {
            assert!(store.path_for(id).is_err(), "id {id:?} should be rejected");
        }
        assert!(store.path_for("my-project_1.0").is_ok());
    }
}
