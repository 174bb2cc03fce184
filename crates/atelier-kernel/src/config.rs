//! Studio configuration.
//!
//! Read from `$XDG_CONFIG_HOME/atelier/config.toml`; every key is optional:
//!
//! ```toml
//! workspace_id = "default"
//! workspace_name = "My Project"
//! persist = true
//! # data_dir = "/path/to/workspaces"
//!
//! [generator]
//! endpoint = "http://localhost:8787/generate"
//! # api_key = "..."          # or ATELIER_API_KEY
//! timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::{CodeGenerator, HttpGenerator, Unconfigured};
use crate::state::{paths, JsonFileStore, MemoryStore, WorkspaceStore};

/// Environment variable consulted when `generator.api_key` is unset.
pub const API_KEY_ENV: &str = "ATELIER_API_KEY";

/// Default bound on a single generation request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for a studio session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Workspace to open (also its snapshot file name).
    pub workspace_id: String,
    /// Display name given to a freshly scaffolded workspace.
    pub workspace_name: String,
    /// Whether to save snapshots to disk.
    pub persist: bool,
    /// Override for the snapshot directory.
    pub data_dir: Option<PathBuf>,
    pub generator: GeneratorConfig,
}

/// Where code generation requests go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            workspace_id: "default".to_string(),
            workspace_name: "My Project".to_string(),
            persist: true,
            data_dir: None,
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StudioConfig {
    /// A non-persistent config, for tests and throwaway sessions.
    pub fn transient() -> Self {
        Self {
            workspace_id: "transient".to_string(),
            persist: false,
            ..Self::default()
        }
    }

    /// Load from `path`, or from the default config file when `None`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(paths::config_file);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text)
                .with_context(|| format!("parsing config: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::Error::new(e).context(format!("reading config: {}", path.display()))),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Bound on a single generation request. Zero is treated as the default.
    pub fn timeout(&self) -> Duration {
        match self.generator.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// The store this config asks for.
    pub fn build_store(&self) -> Arc<dyn WorkspaceStore> {
        if !self.persist {
            return Arc::new(MemoryStore::new());
        }
        match &self.data_dir {
            Some(dir) => Arc::new(JsonFileStore::new(dir)),
            None => Arc::new(JsonFileStore::default_location()),
        }
    }

    /// The generator this config asks for. Without an endpoint every request
    /// fails with "no code generation endpoint configured".
    pub fn build_generator(&self) -> Result<Arc<dyn CodeGenerator>> {
        let Some(endpoint) = &self.generator.endpoint else {
            return Ok(Arc::new(Unconfigured));
        };
        let api_key = self
            .generator
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok());
        Ok(Arc::new(HttpGenerator::new(endpoint.clone(), api_key)?))
    }
}
