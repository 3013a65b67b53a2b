//! Image transfer between a blob store and the `images/` directory.
//!
//! Blobs are keyed by logical path (`images/<name>`), the same string the
//! payload attributes of elements and diagram objects refer to.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::export::{collision_or_io, ExportError, ExportSummary};
use crate::import::ImportError;
use crate::model::Model;
use crate::naming;

/// Attribute that carries an image path by default.
pub const IMAGE_PATH_ATTRIBUTE: &str = "imagePath";

/// Binary store for image bytes, keyed by logical path.
pub trait BlobStore {
    /// Bytes stored under `path`.
    fn get_blob(&self, path: &str) -> Option<Cow<'_, [u8]>>;

    /// Store `bytes` under `path`, replacing any previous blob.
    fn put_blob(&mut self, path: &str, bytes: Vec<u8>);

    /// Stored paths in sorted order.
    fn blob_paths(&self) -> Vec<String>;
}

/// In-memory [`BlobStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.contains_key(path)
    }
}

impl BlobStore for MemoryBlobStore {
    fn get_blob(&self, path: &str) -> Option<Cow<'_, [u8]>> {
        self.blobs
            .get(path)
            .map(|bytes| Cow::Borrowed(bytes.as_slice()))
    }

    fn put_blob(&mut self, path: &str, bytes: Vec<u8>) {
        self.blobs.insert(path.to_string(), bytes);
    }

    fn blob_paths(&self) -> Vec<String> {
        self.blobs.keys().cloned().collect()
    }
}

/// Distinct image paths referenced through any of `attributes`.
pub fn referenced_images(model: &Model, attributes: &[String]) -> BTreeSet<String> {
    model
        .iter()
        .flat_map(|(_, node)| {
            attributes
                .iter()
                .filter_map(move |attribute| node.payload().attribute(attribute))
        })
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write each referenced blob once to `<root>/images/...`.
pub(crate) fn extract_images(
    model: &Model,
    blobs: &dyn BlobStore,
    root: &Path,
    attributes: &[String],
    summary: &mut ExportSummary,
) -> Result<(), ExportError> {
    for logical in referenced_images(model, attributes) {
        if !naming::is_image_path(&logical) {
            warn!("Skipping image reference outside images/: {}", logical);
            summary.skipped_images.push(logical);
            continue;
        }
        let target = naming::image_file_path(root, &logical)?;

        let Some(bytes) = blobs.get_blob(&logical) else {
            warn!("Image '{}' is referenced but not in the blob store", logical);
            summary.missing_images.push(logical);
            continue;
        };

        // Never overwrite: two logical paths folding onto one file is a collision.
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| collision_or_io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| collision_or_io(&target, e))?;
        file.write_all(&bytes)
            .map_err(|e| ExportError::io(&target, e))?;
        debug!("Wrote image {:?}", target);
        summary.images += 1;
    }
    Ok(())
}

/// Put every file under `<root>/images/` into `blobs`. Returns the number of blobs.
pub(crate) fn load_images(
    root: &Path,
    blobs: &mut dyn BlobStore,
    skip_hidden: bool,
) -> Result<usize, ImportError> {
    let images_dir = naming::images_dir(root);
    if !images_dir.is_dir() {
        debug!("No images directory at {:?}", images_dir);
        return Ok(0);
    }

    let walker = WalkDir::new(&images_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(skip_hidden && naming::is_hidden(&entry.file_name().to_string_lossy()))
        });

    let mut count = 0;
    for entry in walker {
        let entry = entry.map_err(|e| ImportError::walk(&images_dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&images_dir) else {
            continue;
        };
        let Some(logical) = naming::logical_image_path(relative) else {
            warn!("Skipping image with a non UTF-8 name: {:?}", entry.path());
            continue;
        };

        let bytes = fs::read(entry.path()).map_err(|e| ImportError::io(entry.path(), e))?;
        blobs.put_blob(&logical, bytes);
        count += 1;
    }

    debug!("Loaded {} images from {:?}", count, images_dir);
    Ok(count)
}
