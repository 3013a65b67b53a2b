//! CLI command implementations
//!
//! This module contains all Grafico CLI command implementations.

pub mod check;
pub mod config;
pub mod digest;
pub mod reexport;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grafico_config::{ConfigLoader, GraficoConfig};
use grafico_core::{ExportOptions, ImportOptions, Imported, Importer};

use crate::GlobalOptions;

/// Current working directory, used for the local config.
pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration with optional config file override.
///
/// With `--config` the file takes the place of the local config, so the
/// order is global → file → overrides.
pub fn load_config(global: &GlobalOptions) -> Result<GraficoConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    let config = if let Some(ref config_path) = global.config {
        loader
            .load_with_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file: {}", config_path.display()))?
    } else {
        loader
            .load(&current_dir()?, Some(&overrides))
            .context("Failed to load configuration")?
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Export settings from configuration.
pub fn export_options(config: &GraficoConfig) -> ExportOptions {
    ExportOptions {
        indent: config.export.indent,
        image_attributes: config.export.image_attributes.clone(),
    }
}

/// Import settings from configuration. `include_hidden` wins over the file.
pub fn import_options(config: &GraficoConfig, include_hidden: bool) -> ImportOptions {
    ImportOptions {
        skip_hidden: config.import.skip_hidden && !include_hidden,
    }
}

/// Import an export directory, resolving references.
pub fn import_export(
    source: &Path,
    config: &GraficoConfig,
    include_hidden: bool,
) -> Result<Imported> {
    Importer::new(source)
        .with_options(import_options(config, include_hidden))
        .import()
        .with_context(|| format!("Failed to import {}", source.display()))
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
