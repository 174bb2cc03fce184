//! XDG Base Directory paths for atelier.
//!
//! | Purpose | XDG Variable | Default | atelier Path |
//! |---------|--------------|---------|--------------|
//! | Workspaces | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/atelier/workspaces/*.json` |
//! | History | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/atelier/history.txt` |
//! | Config | `$XDG_CONFIG_HOME` | `~/.config` | `$XDG_CONFIG_HOME/atelier/config.toml` |

use std::path::PathBuf;

use directories::BaseDirs;

/// Data directory for persistent state.
///
/// Uses `$XDG_DATA_HOME/atelier` or falls back to `~/.local/share/atelier`.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
        .join("atelier")
}

/// Config directory.
///
/// Uses `$XDG_CONFIG_HOME/atelier` or falls back to `~/.config/atelier`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("atelier")
}

/// Default config file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where workspace snapshots live, one JSON file each.
pub fn workspaces_dir() -> PathBuf {
    data_dir().join("workspaces")
}

/// REPL line history.
pub fn history_file() -> PathBuf {
    data_dir().join("history.txt")
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}
