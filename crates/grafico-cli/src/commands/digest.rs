//! Digest command - SHA-256 of every exported file plus one tree digest

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use grafico_core::tree_digest;

use crate::GlobalOptions;

/// Arguments for the digest command
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Export directory (the one holding `model/`)
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the digest command
pub fn execute(args: DigestArgs, global: GlobalOptions) -> Result<()> {
    let digest = tree_digest(&args.path)
        .with_context(|| format!("Failed to hash {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&digest)?);
        return Ok(());
    }

    if !global.quiet {
        for (path, hash) in &digest.files {
            println!("{}  {}", hash, path);
        }
    }
    println!("{}", digest.digest);

    Ok(())
}
