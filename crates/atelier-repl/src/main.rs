//! atelier REPL entry point.
//!
//! ```bash
//! cargo run -p atelier-repl -- --workspace landing-page
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use atelier_kernel::StudioConfig;

#[derive(Parser)]
#[command(name = "atelier", author, version, about, long_about = None)]
struct Cli {
    /// Workspace id to open (created on first use)
    #[arg(short, long)]
    workspace: Option<String>,

    /// Path to config file (default: $XDG_CONFIG_HOME/atelier/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Code generation endpoint, overriding the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Keep the workspace in memory only
    #[arg(long)]
    transient: bool,
}

fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config =
        StudioConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workspace) = cli.workspace {
        config.workspace_id = workspace;
    }
    if let Some(endpoint) = cli.endpoint {
        config.generator.endpoint = Some(endpoint);
    }
    if cli.transient {
        config.persist = false;
    }

    tracing::info!(
        workspace = %config.workspace_id,
        persist = config.persist,
        endpoint = config.generator.endpoint.as_deref().unwrap_or("(none)"),
        "starting atelier"
    );

    atelier_repl::run(config)
}
