use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use forex::core::currency::Currency;
use forex::core::log::init_logging;
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

impl From<Commands> for forex::AppCommand {
    fn from(cmd: Commands) -> forex::AppCommand {
        match cmd {
            Commands::Rate { from, to, driver } => forex::AppCommand::Rate { from, to, driver },
            Commands::Interactive { driver } => forex::AppCommand::Interactive { driver },
            Commands::Drivers => forex::AppCommand::Drivers,
            Commands::Watch { dir } => forex::AppCommand::Watch { dir },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Print the fixed-point rate converting one currency into another
    Rate {
        from: Currency,
        to: Currency,
        /// Driver to quote with, instead of the configured one
        #[arg(short, long)]
        driver: Option<String>,
    },
    /// Read `C1,C2` lines from stdin and print one rate per line
    Interactive {
        #[arg(short, long)]
        driver: Option<String>,
    },
    /// List registered drivers
    Drivers,
    /// Load drivers from a directory and keep watching it for new ones
    Watch {
        /// Extension directory, instead of the configured one
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => forex::cli::setup::setup(),
        Some(cmd) => forex::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
