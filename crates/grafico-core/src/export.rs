//! Exporter
//!
//! Writes a model as a one-file-per-object tree:
//! - `model/` and `images/` are wiped and recreated on every export
//! - referenced image blobs are written once each
//! - folders are written depth-first: directory, descriptor, subfolders, elements
//! - the model descriptor is written last
//!
//! The model is only borrowed, never modified.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{self, CodecError};
use crate::images::{self, BlobStore, IMAGE_PATH_ATTRIBUTE};
use crate::model::{FolderKind, Model, NodeHandle, NodeId, NodeKind};
use crate::naming::{self, InvalidImagePath};
use crate::xml::{self, XmlElement, XmlError};

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("refusing to clear '{path}': {reason}")]
    UnsafeDestination { path: PathBuf, reason: &'static str },

    #[error("'{path}' was already written by another node")]
    PathCollision { path: PathBuf },

    #[error("cannot encode {kind} '{id}': {source}")]
    Encode {
        kind: NodeKind,
        id: NodeId,
        #[source]
        source: CodecError,
    },

    #[error("cannot write '{path}': {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    #[error(transparent)]
    InvalidImagePath(#[from] InvalidImagePath),
}

impl ExportError {
    /// Create a new Io error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn unsafe_destination(path: &Path, reason: &'static str) -> Self {
        Self::UnsafeDestination {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Spaces per indentation level.
    pub indent: usize,
    /// Payload attributes holding image paths.
    pub image_attributes: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            image_attributes: vec![IMAGE_PATH_ATTRIBUTE.to_string()],
        }
    }
}

/// What an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Folder directories created.
    pub folders: usize,
    /// Node files written, descriptors included.
    pub files: usize,
    /// Image files written.
    pub images: usize,
    /// Referenced images absent from the blob store.
    pub missing_images: Vec<String>,
    /// Referenced images outside `images/`.
    pub skipped_images: Vec<String>,
}

/// Writes models to one destination directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    destination: PathBuf,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Export `model` and the images it references.
    ///
    /// On failure partial output may remain; the next export clears it.
    pub fn export(
        &self,
        model: &Model,
        blobs: &dyn BlobStore,
    ) -> Result<ExportSummary, ExportError> {
        info!(
            "Exporting model '{}' to {:?}",
            model.id(),
            self.destination
        );

        let model_dir = naming::model_dir(&self.destination);
        let images_dir = naming::images_dir(&self.destination);
        self.prepare_destination(&model_dir, &images_dir)?;

        let mut summary = ExportSummary::default();
        images::extract_images(
            model,
            blobs,
            &self.destination,
            &self.options.image_attributes,
            &mut summary,
        )?;

        for &folder in model.folders() {
            self.write_folder(model, folder, &model_dir, &mut summary)?;
        }

        let descriptor = codec::encode_model_descriptor(model);
        self.write_node_file(&naming::descriptor_path(&model_dir), &descriptor, &mut summary)?;

        info!(
            "Exported {} files in {} folders and {} images",
            summary.files, summary.folders, summary.images
        );
        Ok(summary)
    }

    /// Wipe and recreate `model/` and `images/`.
    fn prepare_destination(&self, model_dir: &Path, images_dir: &Path) -> Result<(), ExportError> {
        fs::create_dir_all(&self.destination)
            .map_err(|e| ExportError::io(&self.destination, e))?;

        let previous_export = looks_like_export(model_dir)?;
        clear_directory(model_dir, previous_export)?;
        clear_directory(images_dir, previous_export)?;

        fs::create_dir(model_dir).map_err(|e| ExportError::io(model_dir, e))?;
        fs::create_dir(images_dir).map_err(|e| ExportError::io(images_dir, e))?;
        Ok(())
    }

    fn write_folder(
        &self,
        model: &Model,
        handle: NodeHandle,
        parent_dir: &Path,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        let node = &model[handle];
        let (Some(dir_name), Some(descriptor)) = (
            naming::folder_dir_name(node),
            codec::encode_folder_descriptor(node),
        ) else {
            return Err(ExportError::Encode {
                kind: node.kind(),
                id: node.id().clone(),
                source: CodecError::UnexpectedElement {
                    found: node.kind().as_str().to_string(),
                    expected: "a folder",
                },
            });
        };

        let dir = parent_dir.join(dir_name);
        debug!("Writing folder {:?}", dir);
        fs::create_dir(&dir).map_err(|e| collision_or_io(&dir, e))?;
        summary.folders += 1;

        self.write_node_file(&naming::descriptor_path(&dir), &descriptor, summary)?;

        for &subfolder in node.folders() {
            self.write_folder(model, subfolder, &dir, summary)?;
        }

        for &element in node.elements() {
            let leaf = &model[element];
            let encoded =
                codec::encode_leaf(model, element).map_err(|source| ExportError::Encode {
                    kind: leaf.kind(),
                    id: leaf.id().clone(),
                    source,
                })?;
            self.write_node_file(&dir.join(naming::leaf_file_name(leaf)), &encoded, summary)?;
        }

        Ok(())
    }

    /// Write one node file. Never overwrites: an existing file is a collision.
    fn write_node_file(
        &self,
        path: &Path,
        element: &XmlElement,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        let bytes =
            xml::write_document(element, self.options.indent).map_err(|source| {
                ExportError::Xml {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| collision_or_io(path, e))?;
        file.write_all(&bytes)
            .map_err(|e| ExportError::io(path, e))?;

        debug!("Wrote {:?}", path);
        summary.files += 1;
        Ok(())
    }
}

/// Export `model` to `destination` with default options.
pub fn export(
    model: &Model,
    blobs: &dyn BlobStore,
    destination: impl AsRef<Path>,
) -> Result<ExportSummary, ExportError> {
    Exporter::new(destination.as_ref()).export(model, blobs)
}

pub(crate) fn collision_or_io(path: &Path, error: io::Error) -> ExportError {
    if error.kind() == io::ErrorKind::AlreadyExists {
        ExportError::PathCollision {
            path: path.to_path_buf(),
        }
    } else {
        ExportError::io(path, error)
    }
}

/// Whether `model_dir` holds only what an export writes at its top level:
/// the model descriptor and system folder directories. Hidden files such as
/// `.DS_Store` are ignored here and removed with the rest.
fn looks_like_export(model_dir: &Path) -> Result<bool, ExportError> {
    if !model_dir.is_dir() {
        return Ok(false);
    }

    let entries = fs::read_dir(model_dir).map_err(|e| ExportError::io(model_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExportError::io(model_dir, e))?;
        let file_type = entry.file_type().map_err(|e| ExportError::io(entry.path(), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_file() && naming::is_hidden(&name) {
            continue;
        }

        let expected = if file_type.is_dir() {
            FolderKind::from_dir_name(&name).is_some()
        } else {
            file_type.is_file() && naming::is_descriptor(&name)
        };
        if !expected {
            debug!("Unexpected entry {:?} in {:?}", name, model_dir);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Remove `dir` if it exists and is safe to remove.
///
/// Refuses symlinks, non-directories, and non-empty directories when the
/// destination does not hold a previous export.
fn clear_directory(dir: &Path, previous_export: bool) -> Result<(), ExportError> {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ExportError::io(dir, e)),
    };

    if metadata.file_type().is_symlink() {
        return Err(ExportError::unsafe_destination(dir, "it is a symbolic link"));
    }
    if !metadata.is_dir() {
        return Err(ExportError::unsafe_destination(dir, "it is not a directory"));
    }

    let is_empty = fs::read_dir(dir)
        .map_err(|e| ExportError::io(dir, e))?
        .next()
        .is_none();
    if !is_empty && !previous_export {
        return Err(ExportError::unsafe_destination(
            dir,
            "it is not empty and does not hold a previous export",
        ));
    }

    debug!("Removing previous output {:?}", dir);
    fs::remove_dir_all(dir).map_err(|e| ExportError::io(dir, e))
}
