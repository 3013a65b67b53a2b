//! Importer
//!
//! Rebuilds a model from an exported tree in two phases. Loading walks the
//! system folders in their fixed order and registers every node in an
//! [`IdIndex`], leaving forward references as placeholders. Resolution then
//! links placeholders to nodes and repairs back-references.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::codec::{self, CodecError};
use crate::images::{self, BlobStore, MemoryBlobStore};
use crate::model::{FolderKind, Model, NodeHandle, NodeId};
use crate::naming;
use crate::resolve::{ErrorReport, IdIndex, ReportEntry, Resolver};
use crate::xml::{self, XmlElement, XmlError};

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("'{path}' is not a valid export: no model directory")]
    NotAnExport { path: PathBuf },

    #[error("IO error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot list '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot parse '{path}': {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    #[error("cannot decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("malformed export at '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl ImportError {
    /// Create a new Io error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a new Walk error.
    pub fn walk(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }

    fn decode(path: &Path, source: impl Into<CodecError>) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Import settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { skip_hidden: true }
    }
}

/// A loaded but unresolved model.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: Model,
    pub index: IdIndex,
    /// Problems found while loading, such as duplicate identifiers.
    pub issues: Vec<ReportEntry>,
}

/// Result of a full import.
#[derive(Debug, Clone)]
pub struct Imported {
    pub model: Model,
    pub blobs: MemoryBlobStore,
    /// `None` when every reference resolved and no identifier was duplicated.
    pub report: Option<ErrorReport>,
}

/// Reads models from one export directory.
#[derive(Debug, Clone)]
pub struct Importer {
    source: PathBuf,
    options: ImportOptions,
}

impl Importer {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Load, resolve, and read images into a fresh [`MemoryBlobStore`].
    pub fn import(&self) -> Result<Imported, ImportError> {
        let mut blobs = MemoryBlobStore::new();
        let (model, report) = self.import_into(&mut blobs)?;
        Ok(Imported {
            model,
            blobs,
            report,
        })
    }

    /// Load, resolve, and read images into `blobs`.
    pub fn import_into(
        &self,
        blobs: &mut dyn BlobStore,
    ) -> Result<(Model, Option<ErrorReport>), ImportError> {
        let LoadedModel {
            mut model,
            index,
            issues,
        } = self.load()?;

        let mut report = ErrorReport::from_entries(issues);
        if let Some(problems) = Resolver::new(index).resolve(&mut model) {
            report.merge(problems);
        }

        let images = images::load_images(&self.source, blobs, self.options.skip_hidden)?;

        info!(
            "Imported model '{}': {} nodes, {} images, {} problems",
            model.id(),
            model.node_count(),
            images,
            report.len()
        );
        Ok((model, report.into_option()))
    }

    /// Read every node file without resolving references.
    pub fn load(&self) -> Result<LoadedModel, ImportError> {
        let model_dir = naming::model_dir(&self.source);
        if !model_dir.is_dir() {
            return Err(ImportError::NotAnExport {
                path: self.source.clone(),
            });
        }
        info!("Loading model from {:?}", self.source);

        let descriptor_path = naming::descriptor_path(&model_dir);
        if !descriptor_path.is_file() {
            return Err(ImportError::malformed(
                &model_dir,
                "missing the model descriptor",
            ));
        }
        let element = read_xml(&descriptor_path)?;
        let descriptor = codec::decode_model_descriptor(&element)
            .map_err(|e| ImportError::decode(&descriptor_path, e))?;

        let mut loader = Loader {
            model: Model::new(descriptor.id, descriptor.payload),
            index: IdIndex::new(),
            issues: Vec::new(),
            options: &self.options,
        };
        let root = loader.model.root();
        loader.register(root, &descriptor_path);

        loader.warn_unknown_entries(&model_dir)?;

        for kind in FolderKind::SYSTEM {
            let Some(dir_name) = kind.dir_name() else {
                continue;
            };
            let dir = model_dir.join(dir_name);
            if !dir.is_dir() {
                debug!("No {} folder in {:?}", kind, model_dir);
                continue;
            }
            loader.load_folder(None, kind, &dir)?;
        }

        debug!(
            "Loaded {} nodes, {} identifiers indexed",
            loader.model.node_count(),
            loader.index.len()
        );
        Ok(LoadedModel {
            model: loader.model,
            index: loader.index,
            issues: loader.issues,
        })
    }
}

/// Import the export at `source` with default options.
pub fn import(source: impl AsRef<Path>) -> Result<Imported, ImportError> {
    Importer::new(source.as_ref()).import()
}

struct Loader<'a> {
    model: Model,
    index: IdIndex,
    issues: Vec<ReportEntry>,
    options: &'a ImportOptions,
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

impl Loader<'_> {
    /// Index `handle` and every node below it as loaded from `path`.
    fn register(&mut self, handle: NodeHandle, path: &Path) {
        for node in self.model.subtree(handle) {
            let id: NodeId = self.model[node].id().clone();
            if let Some(duplicate) = self.index.register(id, node, Some(path)) {
                warn!("{}", duplicate);
                self.issues.push(duplicate);
            }
        }
    }

    /// Load the folder stored in `dir`: descriptor, subfolders, then leaf files.
    ///
    /// `parent` is `None` for system folders, which attach to the root.
    fn load_folder(
        &mut self,
        parent: Option<NodeHandle>,
        expected: FolderKind,
        dir: &Path,
    ) -> Result<(), ImportError> {
        debug!("Loading folder {:?}", dir);

        let descriptor_path = naming::descriptor_path(dir);
        if !descriptor_path.is_file() {
            return Err(ImportError::malformed(dir, "folder has no descriptor"));
        }
        let element = read_xml(&descriptor_path)?;
        let descriptor = codec::decode_folder_descriptor(&element)
            .map_err(|e| ImportError::decode(&descriptor_path, e))?;

        if descriptor.kind != expected {
            return Err(ImportError::malformed(
                &descriptor_path,
                format!(
                    "descriptor declares a '{}' folder, expected '{}'",
                    descriptor.kind, expected
                ),
            ));
        }

        let created = match parent {
            None => self
                .model
                .add_system_folder(expected, descriptor.id, descriptor.payload),
            Some(parent) => self
                .model
                .add_user_folder(parent, descriptor.id, descriptor.payload),
        };
        let handle = created.map_err(|e| ImportError::decode(&descriptor_path, e))?;
        self.register(handle, &descriptor_path);

        let entries = self.list_entries(dir)?;

        for entry in entries.iter().filter(|entry| entry.is_dir) {
            self.load_folder(Some(handle), FolderKind::User, &entry.path)?;
        }

        for entry in entries.iter().filter(|entry| !entry.is_dir) {
            if naming::is_descriptor(&entry.name) {
                continue;
            }
            if !naming::has_xml_extension(&entry.path) {
                warn!("Skipping non-XML file {:?}", entry.path);
                continue;
            }
            self.load_leaf(handle, &entry.path)?;
        }

        Ok(())
    }

    fn load_leaf(&mut self, folder: NodeHandle, path: &Path) -> Result<(), ImportError> {
        let element = read_xml(path)?;
        let handle = codec::decode_leaf(&mut self.model, folder, &element)
            .map_err(|e| ImportError::decode(path, e))?;
        debug!("Loaded {:?}", path);
        self.register(handle, path);
        Ok(())
    }

    /// Directory entries of `dir` sorted by file name.
    fn list_entries(&self, dir: &Path) -> Result<Vec<Entry>, ImportError> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| ImportError::walk(dir, e))?;
            let Some(name) = entry.file_name().to_str() else {
                warn!("Skipping entry with a non UTF-8 name: {:?}", entry.path());
                continue;
            };
            if self.options.skip_hidden && naming::is_hidden(name) {
                debug!("Skipping hidden entry {:?}", entry.path());
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                warn!("Skipping symbolic link {:?}", entry.path());
                continue;
            }

            entries.push(Entry {
                name: name.to_string(),
                path: entry.path().to_path_buf(),
                is_dir: file_type.is_dir(),
            });
        }

        Ok(entries)
    }

    fn warn_unknown_entries(&self, model_dir: &Path) -> Result<(), ImportError> {
        for entry in self.list_entries(model_dir)? {
            let known = if entry.is_dir {
                FolderKind::from_dir_name(&entry.name).is_some()
            } else {
                naming::is_descriptor(&entry.name)
            };
            if !known {
                warn!("Ignoring unknown entry {:?}", entry.path);
            }
        }
        Ok(())
    }
}

fn read_xml(path: &Path) -> Result<XmlElement, ImportError> {
    let bytes = fs::read(path).map_err(|e| ImportError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|_| ImportError::Xml {
        path: path.to_path_buf(),
        source: XmlError::Encoding,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    xml::read_document(text).map_err(|source| ImportError::Xml {
        path: path.to_path_buf(),
        source,
    })
}
