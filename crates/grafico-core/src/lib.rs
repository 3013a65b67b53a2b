//! Grafico Core - Model graph ↔ filesystem mapping
//!
//! This crate stores an architecture model as one XML file per object so
//! that it can be versioned line by line:
//! - Arena-backed model graph with typed forward references
//! - Deterministic path naming for folders and leaf objects
//! - Exporter that wipes stale output and writes image blobs once
//! - Importer that reloads files into an identifier index
//! - Resolver that relinks references and rebuilds back-references
//! - SHA-256 tree digest for comparing exports

pub mod codec;
pub mod digest;
pub mod export;
pub mod images;
pub mod import;
pub mod model;
pub mod naming;
pub mod resolve;
pub mod xml;

// Model re-exports
pub use model::{
    FolderKind, Model, ModelError, Node, NodeBody, NodeHandle, NodeId, NodeKind, Payload,
    Property, Reference, ReferenceSlot,
};

// Export / import re-exports
pub use export::{export, ExportError, ExportOptions, ExportSummary, Exporter};
pub use import::{import, ImportError, ImportOptions, Imported, Importer, LoadedModel};

// Resolution re-exports
pub use resolve::{resolve, ErrorReport, IdIndex, ReportEntry, Resolver};

// Images and digest re-exports
pub use digest::{compute_file_hash, tree_digest, DigestError, TreeDigest};
pub use images::{referenced_images, BlobStore, MemoryBlobStore, IMAGE_PATH_ATTRIBUTE};
