//! Reference resolution
//!
//! After an ID-keyed reload every forward reference is a placeholder. The
//! resolver walks the model once, swaps placeholders for handles through an
//! [`IdIndex`], and repairs the derived back-reference collections.
//!
//! Problems never abort resolution. They are collected into an
//! [`ErrorReport`] handed back alongside the model.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{Model, NodeHandle, NodeId, NodeKind, Reference, ReferenceSlot};

// ============================================================================
// Identifier index
// ============================================================================

#[derive(Debug, Clone)]
struct IndexEntry {
    handle: NodeHandle,
    source: Option<PathBuf>,
}

/// Identifier → node index built for one import.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    entries: HashMap<NodeId, IndexEntry>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every node of an existing model, reporting duplicate identifiers.
    pub fn from_model(model: &Model) -> (Self, Vec<ReportEntry>) {
        let mut index = Self::new();
        let duplicates = model
            .walk()
            .into_iter()
            .filter_map(|handle| index.register(model[handle].id().clone(), handle, None))
            .collect();
        (index, duplicates)
    }

    /// Register `id`. The first registration wins; a later one is returned
    /// as a [`ReportEntry::DuplicateIdentifier`].
    pub fn register(
        &mut self,
        id: NodeId,
        handle: NodeHandle,
        source: Option<&Path>,
    ) -> Option<ReportEntry> {
        match self.entries.entry(id) {
            Entry::Occupied(existing) => Some(ReportEntry::DuplicateIdentifier {
                id: existing.key().clone(),
                first: existing.get().source.clone(),
                duplicate: source.map(Path::to_path_buf),
            }),
            Entry::Vacant(slot) => {
                slot.insert(IndexEntry {
                    handle,
                    source: source.map(Path::to_path_buf),
                });
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<NodeHandle> {
        self.entries.get(id).map(|entry| entry.handle)
    }

    /// File the node with `id` was loaded from.
    pub fn source(&self, id: &str) -> Option<&Path> {
        self.entries.get(id).and_then(|entry| entry.source.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Error report
// ============================================================================

/// One non-fatal problem found while loading or resolving a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum ReportEntry {
    /// A forward reference names an identifier that was never loaded.
    UnresolvedReference {
        unresolved_id: NodeId,
        referencing_kind: NodeKind,
        referencing_id: NodeId,
        slot: ReferenceSlot,
    },

    /// A forward reference names a node of a kind the slot cannot hold.
    IncompatibleTarget {
        target_id: NodeId,
        target_kind: NodeKind,
        referencing_kind: NodeKind,
        referencing_id: NodeId,
        slot: ReferenceSlot,
    },

    /// Two files declare the same identifier. The first one is kept.
    DuplicateIdentifier {
        id: NodeId,
        first: Option<PathBuf>,
        duplicate: Option<PathBuf>,
    },
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference {
                unresolved_id,
                referencing_kind,
                referencing_id,
                slot,
            } => write!(
                f,
                "{referencing_kind} '{referencing_id}' references unknown id '{unresolved_id}' ({slot})"
            ),
            Self::IncompatibleTarget {
                target_id,
                target_kind,
                referencing_kind,
                referencing_id,
                slot,
            } => write!(
                f,
                "{referencing_kind} '{referencing_id}' cannot reference {target_kind} '{target_id}' ({slot})"
            ),
            Self::DuplicateIdentifier {
                id,
                first,
                duplicate,
            } => {
                write!(f, "duplicate id '{id}'")?;
                if let Some(path) = duplicate {
                    write!(f, " in {}", path.display())?;
                }
                if let Some(path) = first {
                    write!(f, " (first defined in {})", path.display())?;
                }
                Ok(())
            }
        }
    }
}

/// Aggregated problems of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    entries: Vec<ReportEntry>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ReportEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn merge(&mut self, other: ErrorReport) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unresolved references only.
    pub fn unresolved(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::UnresolvedReference { .. }))
    }

    /// `None` when nothing was reported.
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.entries.len() == 1 {
            "problem"
        } else {
            "problems"
        };
        write!(f, "{} {} found in the model:", self.entries.len(), noun)?;
        for entry in &self.entries {
            write!(f, "\n  - {entry}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves placeholders of a loaded model against an [`IdIndex`].
#[derive(Debug, Clone)]
pub struct Resolver {
    index: IdIndex,
}

impl Resolver {
    pub fn new(index: IdIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &IdIndex {
        &self.index
    }

    /// Resolve every forward reference of `model` in one depth-first pass.
    ///
    /// Placeholders that resolve are replaced by handles. Every resolved
    /// reference whose slot carries a back-reference is registered on its
    /// target exactly once, so resolving again changes nothing. Unknown or
    /// incompatible targets are reported and the placeholder is left in place.
    pub fn resolve(&self, model: &mut Model) -> Option<ErrorReport> {
        let mut report = ErrorReport::new();
        let mut resolved = 0usize;
        let mut registered = 0usize;

        for handle in model.walk() {
            let node = &model[handle];
            let referencing_kind = node.kind();
            let referencing_id = node.id().clone();
            let slots: Vec<(ReferenceSlot, Reference)> = node
                .forward_references()
                .into_iter()
                .map(|(slot, reference)| (slot, reference.clone()))
                .collect();

            for (slot, reference) in slots {
                let (target, placeholder) = match &reference {
                    Reference::Resolved(target) => (*target, false),
                    Reference::Unresolved(id) => match self.index.get(id.as_str()) {
                        Some(target) => (target, true),
                        None => {
                            debug!(
                                "Unresolved {} reference '{}' on {} '{}'",
                                slot, id, referencing_kind, referencing_id
                            );
                            report.push(ReportEntry::UnresolvedReference {
                                unresolved_id: id.clone(),
                                referencing_kind,
                                referencing_id: referencing_id.clone(),
                                slot,
                            });
                            continue;
                        }
                    },
                };

                let Some(target_node) = model.get(target) else {
                    warn!(
                        "{} '{}' holds a handle outside the model, skipping",
                        referencing_kind, referencing_id
                    );
                    continue;
                };

                if !slot.accepts(target_node.kind()) {
                    report.push(ReportEntry::IncompatibleTarget {
                        target_id: target_node.id().clone(),
                        target_kind: target_node.kind(),
                        referencing_kind,
                        referencing_id: referencing_id.clone(),
                        slot,
                    });
                    continue;
                }

                if placeholder && model.set_reference(handle, slot, Reference::Resolved(target)) {
                    resolved += 1;
                }
                if slot.registers_back_reference()
                    && model.register_back_reference(target, slot, handle)
                {
                    registered += 1;
                }
            }
        }

        debug!(
            "Resolved {} placeholders, registered {} back-references, {} problems",
            resolved,
            registered,
            report.len()
        );
        report.into_option()
    }
}

/// Resolve a model against an index built from its own nodes.
///
/// Duplicate identifiers are reported; references resolve to the first
/// node in walk order.
pub fn resolve(model: &mut Model) -> Option<ErrorReport> {
    let (index, duplicates) = IdIndex::from_model(model);
    let mut report = ErrorReport::from_entries(duplicates);
    if let Some(problems) = Resolver::new(index).resolve(model) {
        report.merge(problems);
    }
    report.into_option()
}
