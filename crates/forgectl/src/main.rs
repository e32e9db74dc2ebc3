//! Forge Control - CLI client for the Godot Editor plugin.
//!
//! Drives AI-assisted game building over the editor's WebSocket protocol.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forge_common::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forgectl")]
#[command(about = "Drive the Godot Editor from the command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Godot Editor host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Editor plugin WebSocket port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a game from a natural language description
    Build {
        /// What to build, e.g. "a third-person survival game with inventory"
        description: String,
    },

    /// Print the current scene tree
    Snapshot,

    /// Fetch performance metrics and classify them
    Perf,

    /// Stream out-of-band editor messages, reconnecting on drops
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command {
        Commands::Build { description } => commands::build(config, &description).await,
        Commands::Snapshot => commands::snapshot(config).await,
        Commands::Perf => commands::perf(config).await,
        Commands::Watch => commands::watch(config).await,
    }
}
