//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Show configuration file paths
//! - Write a default configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use grafico_config::{ConfigLoader, GraficoConfig};
use serde::Serialize;

use super::{current_dir, print_info};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Write ~/.grafico/config.toml instead of ./.grafico/config.toml
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Explicit config file given with --config
    pub explicit: Option<PathBuf>,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: GlobalOptions, config: &GraficoConfig) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, config),
        ConfigCommand::Path(args) => execute_path(args, global),
        ConfigCommand::Init(args) => execute_init(args, global),
    }
}

fn execute_show(args: ShowArgs, config: &GraficoConfig) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(config).context("Failed to render configuration")?
        );
    }
    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&current_dir()?);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
        explicit: global.config,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    println!("Configuration Paths");
    println!("===================\n");

    if let Some(ref gp) = paths.global {
        println!("Global: {} ({})", gp.display(), existence(paths.global_exists));
    } else {
        println!("Global: not available (no home directory)");
    }
    println!(
        "Local:  {} ({})",
        paths.local.display(),
        existence(paths.local_exists)
    );
    if let Some(ref explicit) = paths.explicit {
        println!("File:   {} (replaces local)", explicit.display());
    }

    Ok(())
}

fn execute_init(args: InitArgs, global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader.init_global()
    } else {
        loader.init_local(&current_dir()?)
    }
    .context("Failed to initialize configuration")?;

    print_info(&format!("Configuration file: {}", path.display()), global.quiet);
    Ok(())
}

fn existence(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}
