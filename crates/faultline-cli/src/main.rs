//! Faultline CLI.
//!
//! Loads a fault injection plan, materializes it against in-memory block
//! devices and reports what the plan does.
//!
//! # Quick Start
//!
//! ```bash
//! # Validate faultline.toml in the current directory
//! faultline check
//!
//! # Drive requests through every device and tally the statuses
//! faultline simulate --rounds 4
//!
//! # Print the replayable creation commands
//! faultline export
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faultline_config::{ConfigLoader, FaultlineConfig};
use tracing_subscriber::EnvFilter;

/// Faultline - fault injection for block storage stacks.
#[derive(Parser)]
#[command(name = "faultline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding faultline.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Read this single TOML file instead of the layered configuration.
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Validate the plan and materialize it.
    Check,

    /// Submit requests to every device and report the resulting statuses.
    Simulate {
        /// Requests of each type submitted per device.
        #[arg(short, long, default_value = "1")]
        rounds: u32,

        /// Finish with a reset of every device.
        #[arg(long)]
        reset: bool,
    },

    /// Print the creation commands that recreate the configured devices.
    Export {
        /// Output format (json, toml).
        #[arg(long, default_value = "json")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        commands::version::run();
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Version => Ok(()),
        Commands::Check => commands::check::run(&config),
        Commands::Simulate { rounds, reset } => commands::simulate::run(&config, rounds, reset),
        Commands::Export { format } => commands::export::run(&config, &format),
    }
}

fn load_config(cli: &Cli) -> Result<FaultlineConfig> {
    match &cli.file {
        Some(path) => {
            let config = FaultlineConfig::from_toml_file(path)?;
            config
                .validate()
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            Ok(config)
        }
        None => ConfigLoader::new()
            .with_project_dir(&cli.project)
            .load()
            .context("Failed to load configuration"),
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays machine-readable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
