//! Graph comparison and back-reference checks for integration tests.
//!
//! Nodes are compared by identifier rather than by handle, since handles
//! differ between a host-built model and its reimported copy.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use grafico_core::{Model, NodeHandle, NodeKind, Payload, ReferenceSlot};
use pretty_assertions::assert_eq;

const BACK_REFERENCE_SLOTS: [ReferenceSlot; 3] = [
    ReferenceSlot::Element,
    ReferenceSlot::Relationship,
    ReferenceSlot::ConnectionTarget,
];

// ============================================================================
// Isomorphism
// ============================================================================

/// Everything about a node that must survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShape {
    pub kind: NodeKind,
    pub type_tag: String,
    pub payload: Payload,
    pub parent: Option<String>,
    /// Forward references as `(slot, target id)`.
    pub references: Vec<(String, String)>,
    /// Subfolders and folder contents, sorted by id.
    pub folder_contents: Vec<String>,
    /// Diagram children then connections, in document order.
    pub diagram_contents: Vec<String>,
}

/// Shape of every node reachable from the root, keyed by id.
pub fn shapes(model: &Model) -> BTreeMap<String, NodeShape> {
    let id_of = |handle: NodeHandle| model[handle].id().to_string();

    model
        .walk()
        .into_iter()
        .map(|handle| {
            let node = &model[handle];
            let references = node
                .forward_references()
                .into_iter()
                .map(|(slot, reference)| {
                    let target = model
                        .reference_id(reference)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    (slot.as_str().to_string(), target)
                })
                .collect();

            let mut folder_contents: Vec<String> = node
                .folders()
                .iter()
                .chain(node.elements())
                .map(|&h| id_of(h))
                .collect();
            folder_contents.sort();

            let diagram_contents = node
                .children()
                .iter()
                .chain(node.connections())
                .map(|&h| id_of(h))
                .collect();

            let shape = NodeShape {
                kind: node.kind(),
                type_tag: node.type_tag().to_string(),
                payload: node.payload().clone(),
                parent: node.parent().map(id_of),
                references,
                folder_contents,
                diagram_contents,
            };
            (node.id().to_string(), shape)
        })
        .collect()
}

/// Assert that two models hold the same nodes, payloads and references.
pub fn assert_isomorphic(expected: &Model, actual: &Model) {
    assert_eq!(expected.id(), actual.id(), "model ids differ");
    assert_eq!(shapes(expected), shapes(actual));
}

// ============================================================================
// Back-references
// ============================================================================

/// Back-references implied by resolved forward references:
/// `(target id, slot) → referencing ids`.
pub fn scanned_back_references(model: &Model) -> BTreeMap<(String, String), BTreeSet<String>> {
    let mut expected: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for handle in model.walk() {
        let node = &model[handle];
        for (slot, reference) in node.forward_references() {
            if !slot.registers_back_reference() {
                continue;
            }
            let Some(target) = reference.handle() else {
                continue;
            };
            if !slot.accepts(model[target].kind()) {
                continue;
            }
            expected
                .entry((model[target].id().to_string(), slot.as_str().to_string()))
                .or_default()
                .insert(node.id().to_string());
        }
    }
    expected
}

/// Back-references stored on the nodes, in the same shape as
/// [`scanned_back_references`]. Panics on duplicate entries.
pub fn stored_back_references(model: &Model) -> BTreeMap<(String, String), BTreeSet<String>> {
    let mut stored = BTreeMap::new();
    for handle in model.walk() {
        let node = &model[handle];
        for slot in BACK_REFERENCE_SLOTS {
            let handles = node.back_references(slot);
            if handles.is_empty() {
                continue;
            }
            let ids: BTreeSet<String> = handles
                .iter()
                .map(|&h| model[h].id().to_string())
                .collect();
            assert_eq!(
                ids.len(),
                handles.len(),
                "duplicate {} back-references on '{}'",
                slot,
                node.id()
            );
            stored.insert((node.id().to_string(), slot.as_str().to_string()), ids);
        }
    }
    stored
}

/// Assert that stored back-references equal an independent scan.
pub fn assert_back_references_consistent(model: &Model) {
    assert_eq!(scanned_back_references(model), stored_back_references(model));
}

/// Total number of stored back-references.
pub fn back_reference_count(model: &Model) -> usize {
    model
        .walk()
        .into_iter()
        .map(|handle| {
            BACK_REFERENCE_SLOTS
                .iter()
                .map(|&slot| model[handle].back_references(slot).len())
                .sum::<usize>()
        })
        .sum()
}
