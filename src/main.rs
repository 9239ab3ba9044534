mod commands;
mod logging;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calsync_core::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Mirror busy time across your calendars as opaque placeholders")]
struct Cli {
    /// Config file (defaults to ~/.config/calsync/config.toml)
    #[arg(short, long, global = true, env = "CALSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass over all configured calendars
    Run {
        /// Days ahead of now to mirror (overrides sync_window_days)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// List configured calendars
    Calendars,
    /// Show stored source -> placeholder mappings
    Mappings {
        /// Only mappings whose source is this calendar id
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let settings = load_settings(&config_path)?;
    logging::init(&settings.log_level, settings.json_log);

    match cli.command {
        Commands::Run { days } => commands::run::run(&settings, days),
        Commands::Calendars => commands::calendars::run(&settings),
        Commands::Mappings { source } => commands::mappings::run(&settings, source.as_deref()),
    }
}

/// Load `.env` (or the file named by `CALSYNC_ENV_PATH`) if there is one.
fn load_env_file() {
    let result = match std::env::var_os("CALSYNC_ENV_PATH") {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    if let Err(e) = result {
        if !e.not_found() {
            eprintln!("warning: could not load .env file: {e}");
        }
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(path).with_context(|| format!("Failed to load settings from {}", path.display()))
}
