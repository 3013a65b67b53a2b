//! Grafico CLI - Check, inspect and rewrite one-file-per-object model exports
//!
//! # Usage
//!
//! ```bash
//! # Report unresolved references and duplicate ids
//! grafico check ./exported-model
//!
//! # Count nodes per kind
//! grafico stats ./exported-model --json
//!
//! # Rewrite an export in canonical form
//! grafico reexport ./exported-model ./canonical
//!
//! # Hash every exported file
//! grafico digest ./canonical
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grafico_config::{ConfigOverrides, LogFormat, LoggingConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Grafico - One-file-per-object XML exports of architecture models
#[derive(Parser, Debug)]
#[command(name = "grafico")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "GRAFICO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            log_level,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an export and report reference problems
    Check(commands::check::CheckArgs),

    /// Show node counts of an export
    Stats(commands::stats::StatsArgs),

    /// Import an export and write it again in canonical form
    Reexport(commands::reexport::ReexportArgs),

    /// Hash every file of an export
    Digest(commands::digest::DigestArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.global)?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Check(args) => commands::check::execute(args, cli.global, &config),
        Commands::Stats(args) => commands::stats::execute(args, cli.global, &config),
        Commands::Reexport(args) => commands::reexport::execute(args, cli.global, &config),
        Commands::Digest(args) => commands::digest::execute(args, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global, &config),
    }
}

/// Install the stderr subscriber for the configured level and format.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let level: Level = logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
