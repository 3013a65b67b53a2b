//! Stats command - Node counts of an export

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use grafico_config::GraficoConfig;
use grafico_core::{FolderKind, Model};
use serde::Serialize;

use super::{import_export, print_warning};
use crate::GlobalOptions;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Export directory (the one holding `model/`)
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Read dot-files and dot-directories as well
    #[arg(long)]
    include_hidden: bool,
}

/// Counts gathered from one imported model
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub model_id: String,
    pub model_name: Option<String>,
    /// Reachable nodes, the model node included
    pub nodes: usize,
    /// Node count per kind
    pub kinds: BTreeMap<&'static str, usize>,
    /// Nodes below each present system folder, in import order
    pub folders: Vec<FolderStats>,
    pub images: usize,
    pub problems: usize,
}

/// Nodes below one system folder
#[derive(Debug, Clone, Serialize)]
pub struct FolderStats {
    pub folder: &'static str,
    pub nodes: usize,
}

impl ModelStats {
    fn collect(model: &Model, images: usize, problems: usize) -> Self {
        let reachable = model.walk();

        let mut kinds = BTreeMap::new();
        for &handle in &reachable {
            *kinds.entry(model[handle].kind().as_str()).or_insert(0) += 1;
        }

        let folders = FolderKind::SYSTEM
            .into_iter()
            .filter_map(|kind| {
                let handle = model.system_folder(kind)?;
                Some(FolderStats {
                    folder: kind.dir_name()?,
                    nodes: model.subtree(handle).len().saturating_sub(1),
                })
            })
            .collect();

        let root = &model[model.root()];
        Self {
            model_id: model.id().to_string(),
            model_name: root.payload().name().map(ToString::to_string),
            nodes: reachable.len(),
            kinds,
            folders,
            images,
            problems,
        }
    }
}

/// Execute the stats command
pub fn execute(args: StatsArgs, _global: GlobalOptions, config: &GraficoConfig) -> Result<()> {
    let imported = import_export(&args.path, config, args.include_hidden)?;
    let problems = imported.report.as_ref().map_or(0, |report| report.len());
    let stats = ModelStats::collect(&imported.model, imported.blobs.len(), problems);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    match stats.model_name {
        Some(ref name) => println!("Model: {} ({})", name, stats.model_id),
        None => println!("Model: {}", stats.model_id),
    }
    println!("Nodes: {}", stats.nodes);
    for (kind, count) in &stats.kinds {
        println!("  {:<18} {}", kind, count);
    }
    println!("Folders:");
    for folder in &stats.folders {
        println!("  {:<24} {}", folder.folder, folder.nodes);
    }
    println!("Images: {}", stats.images);

    if stats.problems > 0 {
        print_warning(&format!(
            "{} problems found, run `grafico check` for details",
            stats.problems
        ));
    }

    Ok(())
}
