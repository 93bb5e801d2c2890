pub mod aggregate;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::{AppConfig, Symbol};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch, persist and aggregate all configured functions for a symbol
    Run { symbol: Option<String> },
    /// Aggregate payload files saved by an earlier run
    Aggregate {
        files: Vec<PathBuf>,
        output: Option<PathBuf>,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Run { symbol } => {
            let symbol = symbol
                .filter(|s| !s.trim().is_empty())
                .context("Usage: avmonthly run <SYMBOL>")?;
            let symbol: Symbol = symbol.parse()?;
            info!(%symbol, "avmonthly starting...");

            let config = load_config(config_path)?;
            let summary = cli::run::run(&symbol, &config).await?;
            println!("{}", summary.display());
            Ok(())
        }
        AppCommand::Aggregate { files, output } => {
            let config = load_config(config_path)?;
            cli::aggregate::run(&files, output.as_deref(), config.averaging)
        }
    }
}
