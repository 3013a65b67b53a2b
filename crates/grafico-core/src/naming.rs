//! Path naming scheme.
//!
//! Maps nodes to paths under an export root:
//! - `model/folder.xml` for the model descriptor
//! - `model/<SystemFolderName>/folder.xml` for system folders
//! - `<parent>/<UserFolderId>/folder.xml` for user folders
//! - `<folder>/<TypeTag>_<id>.xml` for elements, relationships and views
//! - `images/<name>` for image blobs

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::model::{Node, NodeBody};

/// Directory holding the node files.
pub const MODEL_DIR: &str = "model";

/// Directory holding image blobs.
pub const IMAGES_DIR: &str = "images";

/// Reserved file name of model and folder descriptors.
pub const DESCRIPTOR_FILE: &str = "folder.xml";

/// Extension of every node file.
pub const FILE_EXTENSION: &str = "xml";

/// Logical image path that cannot be mapped onto the export tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid image path '{path}': {reason}")]
pub struct InvalidImagePath {
    pub path: String,
    pub reason: &'static str,
}

pub fn model_dir(root: &Path) -> PathBuf {
    root.join(MODEL_DIR)
}

pub fn images_dir(root: &Path) -> PathBuf {
    root.join(IMAGES_DIR)
}

pub fn descriptor_path(dir: &Path) -> PathBuf {
    dir.join(DESCRIPTOR_FILE)
}

/// Directory name of a folder node: the fixed name for system kinds, the id otherwise.
pub fn folder_dir_name(node: &Node) -> Option<&str> {
    match node.body() {
        NodeBody::Folder { folder_kind, .. } => {
            Some(folder_kind.dir_name().unwrap_or(node.id().as_str()))
        }
        _ => None,
    }
}

/// File name of a leaf node: `<TypeTag>_<id>.xml`.
pub fn leaf_file_name(node: &Node) -> String {
    format!("{}_{}.{}", node.type_tag(), node.id(), FILE_EXTENSION)
}

/// Whether `name` has the `.xml` extension of descriptor and leaf files,
/// compared case-insensitively. User folders may not use such names.
pub fn is_node_file_name(name: &str) -> bool {
    has_xml_extension(Path::new(name))
}

pub fn is_descriptor(file_name: &str) -> bool {
    file_name == DESCRIPTOR_FILE
}

/// Dot-files such as `.DS_Store` or `.gitkeep`.
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.')
}

pub fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case(FILE_EXTENSION))
}

/// Whether a logical path lives under `images/`.
pub fn is_image_path(logical: &str) -> bool {
    logical
        .strip_prefix(IMAGES_DIR)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Filesystem location of a logical image path below `root`.
///
/// Rejects segments that would escape the images directory, and hidden
/// segments, which import skips.
pub fn image_file_path(root: &Path, logical: &str) -> Result<PathBuf, InvalidImagePath> {
    let invalid = |reason| InvalidImagePath {
        path: logical.to_string(),
        reason,
    };

    let mut segments = logical.split('/');
    if segments.next() != Some(IMAGES_DIR) {
        return Err(invalid("must start with 'images/'"));
    }

    let mut path = images_dir(root);
    let mut named = false;
    for segment in segments {
        if segment.is_empty() || is_hidden(segment) {
            return Err(invalid("contains an empty, relative or hidden segment"));
        }
        if segment.contains(['\\', ':']) {
            return Err(invalid("contains a path separator"));
        }
        path.push(segment);
        named = true;
    }

    if named {
        Ok(path)
    } else {
        Err(invalid("does not name a file"))
    }
}

/// Logical path for a file found at `relative` inside the images directory.
pub fn logical_image_path(relative: &Path) -> Option<String> {
    let mut logical = String::from(IMAGES_DIR);
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                logical.push('/');
                logical.push_str(segment.to_str()?);
            }
            _ => return None,
        }
    }
    (logical.len() > IMAGES_DIR.len()).then_some(logical)
}
