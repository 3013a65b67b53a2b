//! Tree digest
//!
//! SHA-256 fingerprint of an export tree: one hash per file under `model/`
//! and `images/`, combined into a single digest over the sorted
//! `(relative path, file hash)` pairs.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::naming;

/// Errors raised while fingerprinting a tree.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("cannot list '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot hash '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file hashes and the combined digest of an export tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeDigest {
    /// `/`-separated path relative to the export root → hex SHA-256.
    pub files: BTreeMap<String, String>,
    /// Hex SHA-256 over every `path\0hash\n` line in path order.
    pub digest: String,
}

impl TreeDigest {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Fingerprint the `model/` and `images/` directories below `root`.
///
/// Absent directories contribute nothing. Symbolic links are not followed.
pub fn tree_digest(root: &Path) -> Result<TreeDigest, DigestError> {
    let mut files = BTreeMap::new();

    for dir in [naming::model_dir(root), naming::images_dir(root)] {
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|source| DigestError::Walk {
                path: dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative) = relative_key(root, entry.path()) else {
                continue;
            };
            let hash = compute_file_hash(entry.path()).map_err(|source| DigestError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            files.insert(relative, hash);
        }
    }

    let mut hasher = Sha256::new();
    for (path, hash) in &files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    let digest = format!("{:x}", hasher.finalize());

    debug!("Digested {} files under {:?}: {}", files.len(), root, digest);
    Ok(TreeDigest { files, digest })
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn compute_file_hash(file_path: &Path) -> std::io::Result<String> {
    let file = File::open(file_path)?;
    let mut reader = BufReader::with_capacity(8192, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect();
    Some(segments?.join("/"))
}
