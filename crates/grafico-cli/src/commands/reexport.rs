//! Reexport command - Import an export and write it again in canonical form
//!
//! The destination is replaced the same way a regular export replaces it:
//! only a previous export is ever cleared.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use grafico_config::GraficoConfig;
use grafico_core::Exporter;
use serde::Serialize;

use super::{export_options, import_export, print_info, print_warning};
use crate::GlobalOptions;

/// Arguments for the reexport command
#[derive(Args, Debug)]
pub struct ReexportArgs {
    /// Export directory to read
    source: PathBuf,

    /// Directory to write the canonical export to
    destination: PathBuf,

    /// Spaces per indentation level (overrides export.indent)
    #[arg(long)]
    indent: Option<usize>,

    /// Read dot-files and dot-directories as well
    #[arg(long)]
    include_hidden: bool,

    /// Output the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ReexportOutput<'a> {
    source: &'a PathBuf,
    destination: &'a PathBuf,
    summary: grafico_core::ExportSummary,
    problems: Vec<grafico_core::ReportEntry>,
}

/// Execute the reexport command
pub fn execute(args: ReexportArgs, global: GlobalOptions, config: &GraficoConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(indent) = args.indent {
        config.export.indent = indent;
        config.validate().context("Invalid --indent")?;
    }

    let imported = import_export(&args.source, &config, args.include_hidden)?;

    std::fs::create_dir_all(&args.destination).with_context(|| {
        format!(
            "Failed to create destination {}",
            args.destination.display()
        )
    })?;

    let summary = Exporter::new(&args.destination)
        .with_options(export_options(&config))
        .export(&imported.model, &imported.blobs)
        .with_context(|| format!("Failed to export to {}", args.destination.display()))?;

    let problems = imported
        .report
        .as_ref()
        .map(|report| report.entries().to_vec())
        .unwrap_or_default();

    if args.json {
        let output = ReexportOutput {
            source: &args.source,
            destination: &args.destination,
            summary,
            problems,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_info(
        &format!(
            "Wrote {} files in {} folders and {} images to {}",
            summary.files,
            summary.folders,
            summary.images,
            args.destination.display()
        ),
        global.quiet,
    );
    for path in &summary.missing_images {
        print_warning(&format!("image not found: {}", path));
    }
    if let Some(report) = imported.report {
        print_warning(&report.to_string());
    }

    Ok(())
}
