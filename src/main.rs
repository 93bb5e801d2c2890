use anyhow::Result;
use avmonthly::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for avmonthly::AppCommand {
    fn from(cmd: Commands) -> avmonthly::AppCommand {
        match cmd {
            Commands::Run { symbol } => avmonthly::AppCommand::Run { symbol },
            Commands::Aggregate { files, output } => {
                avmonthly::AppCommand::Aggregate { files, output }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch data for a symbol and write monthly averages
    Run {
        /// Stock ticker symbol, case-insensitive
        symbol: Option<String>,
    },
    /// Compute monthly averages from previously saved payload files
    Aggregate {
        /// Payload files, each named after its data-function
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => avmonthly::cli::setup::setup(),
        Some(cmd) => avmonthly::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
