mod commands;
mod engine;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use anycal_core::sync::SyncDirection;

#[derive(Parser)]
#[command(name = "anycal")]
#[command(about = "Sync calendar links against their external providers")]
struct Cli {
    /// Path to a config file (defaults to ~/.config/anycal/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured calendar links
    Links,
    /// Pull then push, per each link's toggles
    Sync {
        /// Only operate on this link (by id)
        link: Option<String>,

        /// Print results as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Pull remote events into the local store
    Pull {
        /// Only operate on this link (by id)
        link: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Push local events to the provider
    Push {
        /// Only operate on this link (by id)
        link: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let engine = engine::build(cli.config.as_deref())?;

    match cli.command {
        Commands::Links => commands::links::run(&engine),
        Commands::Sync { link, json } => {
            commands::sync::run(&engine, link.as_deref(), SyncDirection::Both, json).await
        }
        Commands::Pull { link, json } => {
            commands::sync::run(&engine, link.as_deref(), SyncDirection::Pull, json).await
        }
        Commands::Push { link, json } => {
            commands::sync::run(&engine, link.as_deref(), SyncDirection::Push, json).await
        }
    }
}
