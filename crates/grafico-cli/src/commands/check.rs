//! Check command - Import an export and report reference problems
//!
//! Exits with status 1 when the report is not empty.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use grafico_config::GraficoConfig;
use grafico_core::ReportEntry;

use super::{import_export, print_info};
use crate::GlobalOptions;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Export directory (the one holding `model/`)
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Read dot-files and dot-directories as well
    #[arg(long)]
    include_hidden: bool,
}

/// Execute the check command
pub fn execute(args: CheckArgs, global: GlobalOptions, config: &GraficoConfig) -> Result<()> {
    let imported = import_export(&args.path, config, args.include_hidden)?;
    let entries: Vec<ReportEntry> = imported
        .report
        .as_ref()
        .map(|report| report.entries().to_vec())
        .unwrap_or_default();

    if args.json {
        let output = serde_json::json!({
            "source": args.path,
            "model_id": imported.model.id(),
            "nodes": imported.model.node_count(),
            "problems": entries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(ref report) = imported.report {
        println!("{}", report);
    } else {
        print_info(
            &format!(
                "{}: {} nodes, no problems found",
                args.path.display(),
                imported.model.node_count()
            ),
            global.quiet,
        );
    }

    if !entries.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
