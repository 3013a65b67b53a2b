//! Node types of the model graph.
//!
//! Every persisted unit is a [`Node`]: an externally assigned [`NodeId`], a
//! type tag, an opaque [`Payload`] and a kind-specific [`NodeBody`] holding
//! containment lists, forward reference slots and derived back-references.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::{ModelError, Payload};

/// Type tag carried by the model root.
pub const MODEL_TYPE_TAG: &str = "Model";

/// Type tag carried by folders.
pub const FOLDER_TYPE_TAG: &str = "Folder";

// ============================================================================
// Identifiers
// ============================================================================

/// Externally assigned, globally unique node identifier.
///
/// Identifiers double as directory and file name segments, so they are
/// validated to be path-safe on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a validated identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        validate_id(&value)?;
        Ok(Self(value))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_id(value: &str) -> Result<(), ModelError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.starts_with('.') {
        Some("must not start with '.'")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if value.contains([':', '*', '?', '"', '<', '>', '|']) {
        Some("must not contain characters reserved in file names")
    } else if value.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ModelError::InvalidId {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for NodeId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Handle of a node inside one [`Model`](super::Model) arena.
///
/// Handles are minted by the model and are only meaningful for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) usize);

impl NodeHandle {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Model,
    Folder,
    Element,
    Relationship,
    DiagramView,
    DiagramChild,
    DiagramConnection,
    DiagramReference,
}

impl NodeKind {
    /// Name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::Folder => "Folder",
            Self::Element => "Element",
            Self::Relationship => "Relationship",
            Self::DiagramView => "DiagramView",
            Self::DiagramChild => "DiagramChild",
            Self::DiagramConnection => "DiagramConnection",
            Self::DiagramReference => "DiagramReference",
        }
    }

    /// Forward reference slots a node of this kind carries.
    pub fn reference_slots(self) -> &'static [ReferenceSlot] {
        match self {
            Self::Relationship => &[ReferenceSlot::Source, ReferenceSlot::Target],
            Self::DiagramChild => &[ReferenceSlot::Element],
            Self::DiagramConnection => &[ReferenceSlot::Relationship, ReferenceSlot::ConnectionTarget],
            Self::DiagramReference => &[ReferenceSlot::View],
            Self::Model | Self::Folder | Self::Element | Self::DiagramView => &[],
        }
    }

    /// Whether nodes of this kind are written to their own file.
    pub fn is_leaf_file(self) -> bool {
        matches!(self, Self::Element | Self::Relationship | Self::DiagramView)
    }

    /// Whether this kind is an object placed on a diagram.
    pub fn is_diagram_object(self) -> bool {
        matches!(self, Self::DiagramChild | Self::DiagramReference)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder kinds: the nine system kinds plus user-created folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderKind {
    Strategy,
    Business,
    Application,
    Technology,
    Motivation,
    ImplementationMigration,
    Other,
    Relations,
    Diagrams,
    User,
}

impl FolderKind {
    /// System folder kinds in their fixed import order.
    pub const SYSTEM: [FolderKind; 9] = [
        FolderKind::Strategy,
        FolderKind::Business,
        FolderKind::Application,
        FolderKind::Technology,
        FolderKind::Motivation,
        FolderKind::ImplementationMigration,
        FolderKind::Other,
        FolderKind::Relations,
        FolderKind::Diagrams,
    ];

    pub fn is_system(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Fixed directory name of a system folder. User folders are named by id.
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            Self::Strategy => Some("Strategy"),
            Self::Business => Some("Business"),
            Self::Application => Some("Application"),
            Self::Technology => Some("Technology"),
            Self::Motivation => Some("Motivation"),
            Self::ImplementationMigration => Some("ImplementationMigration"),
            Self::Other => Some("Other"),
            Self::Relations => Some("Relations"),
            Self::Diagrams => Some("Diagrams"),
            Self::User => None,
        }
    }

    /// Look up a system kind by its directory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::SYSTEM
            .into_iter()
            .find(|kind| kind.dir_name() == Some(name))
    }

    /// Token written to the `type` attribute of folder descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Business => "business",
            Self::Application => "application",
            Self::Technology => "technology",
            Self::Motivation => "motivation",
            Self::ImplementationMigration => "implementation_migration",
            Self::Other => "other",
            Self::Relations => "relations",
            Self::Diagrams => "diagrams",
            Self::User => "user",
        }
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FolderKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SYSTEM
            .into_iter()
            .chain(std::iter::once(Self::User))
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownFolderKind {
                value: s.to_string(),
            })
    }
}

// ============================================================================
// References
// ============================================================================

/// Content of a forward reference slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Points at a node of the same model.
    Resolved(NodeHandle),
    /// Placeholder carrying only the target identifier.
    Unresolved(NodeId),
}

impl Reference {
    /// Placeholder for an identifier.
    pub fn to_id(id: &NodeId) -> Self {
        Self::Unresolved(id.clone())
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Target handle, once resolved.
    pub fn handle(&self) -> Option<NodeHandle> {
        match self {
            Self::Resolved(handle) => Some(*handle),
            Self::Unresolved(_) => None,
        }
    }
}

/// Named forward reference slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSlot {
    /// Relationship source.
    Source,
    /// Relationship target.
    Target,
    /// Element shown by a diagram child.
    Element,
    /// Relationship drawn by a diagram connection.
    Relationship,
    /// Diagram object a connection ends at.
    ConnectionTarget,
    /// View referenced by a diagram reference.
    View,
}

impl ReferenceSlot {
    /// Name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Element => "element",
            Self::Relationship => "relationship",
            Self::ConnectionTarget => "connection-target",
            Self::View => "view",
        }
    }

    /// XML attribute the slot is persisted under.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target | Self::ConnectionTarget => "target",
            Self::Element => "element",
            Self::Relationship => "relationship",
            Self::View => "view",
        }
    }

    /// Whether a node of `kind` is a valid target for this slot.
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            Self::Source | Self::Target => {
                matches!(kind, NodeKind::Element | NodeKind::Relationship)
            }
            Self::Element => kind == NodeKind::Element,
            Self::Relationship => kind == NodeKind::Relationship,
            Self::ConnectionTarget => kind.is_diagram_object(),
            Self::View => kind == NodeKind::DiagramView,
        }
    }

    /// Whether resolving this slot registers a back-reference on the target.
    ///
    /// Relationship endpoints and view references do not.
    pub fn registers_back_reference(self) -> bool {
        matches!(
            self,
            Self::Element | Self::Relationship | Self::ConnectionTarget
        )
    }
}

impl fmt::Display for ReferenceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Kind-specific content of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    Model {
        folders: Vec<NodeHandle>,
    },
    Folder {
        folder_kind: FolderKind,
        folders: Vec<NodeHandle>,
        elements: Vec<NodeHandle>,
    },
    Element {
        /// Derived: diagram children showing this element.
        referencing_diagram_objects: Vec<NodeHandle>,
    },
    Relationship {
        source: Option<Reference>,
        target: Option<Reference>,
        /// Derived: diagram connections drawing this relationship.
        referencing_diagram_connections: Vec<NodeHandle>,
    },
    DiagramView {
        children: Vec<NodeHandle>,
    },
    DiagramChild {
        element: Option<Reference>,
        children: Vec<NodeHandle>,
        connections: Vec<NodeHandle>,
        /// Derived: connections ending at this object.
        target_connections: Vec<NodeHandle>,
    },
    DiagramConnection {
        relationship: Option<Reference>,
        target: Option<Reference>,
    },
    DiagramReference {
        view: Option<Reference>,
        connections: Vec<NodeHandle>,
        /// Derived: connections ending at this object.
        target_connections: Vec<NodeHandle>,
    },
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Model { .. } => NodeKind::Model,
            Self::Folder { .. } => NodeKind::Folder,
            Self::Element { .. } => NodeKind::Element,
            Self::Relationship { .. } => NodeKind::Relationship,
            Self::DiagramView { .. } => NodeKind::DiagramView,
            Self::DiagramChild { .. } => NodeKind::DiagramChild,
            Self::DiagramConnection { .. } => NodeKind::DiagramConnection,
            Self::DiagramReference { .. } => NodeKind::DiagramReference,
        }
    }

    /// Containment list that holds children of `child` kind, if allowed here.
    pub(crate) fn child_list_mut(&mut self, child: NodeKind) -> Option<&mut Vec<NodeHandle>> {
        match (self, child) {
            (Self::Model { folders }, NodeKind::Folder) => Some(folders),
            (Self::Folder { folders, .. }, NodeKind::Folder) => Some(folders),
            (Self::Folder { elements, .. }, kind) if kind.is_leaf_file() => Some(elements),
            (Self::DiagramView { children }, kind) if kind.is_diagram_object() => Some(children),
            (Self::DiagramChild { children, .. }, kind) if kind.is_diagram_object() => {
                Some(children)
            }
            (Self::DiagramChild { connections, .. }, NodeKind::DiagramConnection) => {
                Some(connections)
            }
            (Self::DiagramReference { connections, .. }, NodeKind::DiagramConnection) => {
                Some(connections)
            }
            _ => None,
        }
    }

    fn slot(&self, slot: ReferenceSlot) -> Option<&Option<Reference>> {
        match (self, slot) {
            (Self::Relationship { source, .. }, ReferenceSlot::Source) => Some(source),
            (Self::Relationship { target, .. }, ReferenceSlot::Target) => Some(target),
            (Self::DiagramChild { element, .. }, ReferenceSlot::Element) => Some(element),
            (Self::DiagramConnection { relationship, .. }, ReferenceSlot::Relationship) => {
                Some(relationship)
            }
            (Self::DiagramConnection { target, .. }, ReferenceSlot::ConnectionTarget) => {
                Some(target)
            }
            (Self::DiagramReference { view, .. }, ReferenceSlot::View) => Some(view),
            _ => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: ReferenceSlot) -> Option<&mut Option<Reference>> {
        match (self, slot) {
            (Self::Relationship { source, .. }, ReferenceSlot::Source) => Some(source),
            (Self::Relationship { target, .. }, ReferenceSlot::Target) => Some(target),
            (Self::DiagramChild { element, .. }, ReferenceSlot::Element) => Some(element),
            (Self::DiagramConnection { relationship, .. }, ReferenceSlot::Relationship) => {
                Some(relationship)
            }
            (Self::DiagramConnection { target, .. }, ReferenceSlot::ConnectionTarget) => {
                Some(target)
            }
            (Self::DiagramReference { view, .. }, ReferenceSlot::View) => Some(view),
            _ => None,
        }
    }

    fn back_references(&self, slot: ReferenceSlot) -> Option<&Vec<NodeHandle>> {
        match (self, slot) {
            (Self::Element { referencing_diagram_objects }, ReferenceSlot::Element) => {
                Some(referencing_diagram_objects)
            }
            (
                Self::Relationship {
                    referencing_diagram_connections,
                    ..
                },
                ReferenceSlot::Relationship,
            ) => Some(referencing_diagram_connections),
            (Self::DiagramChild { target_connections, .. }, ReferenceSlot::ConnectionTarget)
            | (
                Self::DiagramReference { target_connections, .. },
                ReferenceSlot::ConnectionTarget,
            ) => Some(target_connections),
            _ => None,
        }
    }

    pub(crate) fn back_references_mut(
        &mut self,
        slot: ReferenceSlot,
    ) -> Option<&mut Vec<NodeHandle>> {
        match (self, slot) {
            (Self::Element { referencing_diagram_objects }, ReferenceSlot::Element) => {
                Some(referencing_diagram_objects)
            }
            (
                Self::Relationship {
                    referencing_diagram_connections,
                    ..
                },
                ReferenceSlot::Relationship,
            ) => Some(referencing_diagram_connections),
            (Self::DiagramChild { target_connections, .. }, ReferenceSlot::ConnectionTarget)
            | (
                Self::DiagramReference { target_connections, .. },
                ReferenceSlot::ConnectionTarget,
            ) => Some(target_connections),
            _ => None,
        }
    }
}

/// One persisted unit of the model graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) type_tag: String,
    pub(crate) payload: Payload,
    pub(crate) body: NodeBody,
    pub(crate) parent: Option<NodeHandle>,
}

impl Node {
    pub(crate) fn new(id: NodeId, type_tag: String, payload: Payload, body: NodeBody) -> Self {
        Self {
            id,
            type_tag,
            payload,
            body,
            parent: None,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    /// Human-readable type, e.g. `BusinessActor`.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Containing node, `None` for the model root.
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Folder kind, for folders.
    pub fn folder_kind(&self) -> Option<FolderKind> {
        match &self.body {
            NodeBody::Folder { folder_kind, .. } => Some(*folder_kind),
            _ => None,
        }
    }

    /// Content of a forward reference slot.
    pub fn reference(&self, slot: ReferenceSlot) -> Option<&Reference> {
        self.body.slot(slot).and_then(Option::as_ref)
    }

    /// All populated forward reference slots, in slot order.
    pub fn forward_references(&self) -> Vec<(ReferenceSlot, &Reference)> {
        self.kind()
            .reference_slots()
            .iter()
            .filter_map(|&slot| self.reference(slot).map(|reference| (slot, reference)))
            .collect()
    }

    /// Back-reference collection populated by resolving `slot` on other nodes.
    pub fn back_references(&self, slot: ReferenceSlot) -> &[NodeHandle] {
        self.body
            .back_references(slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn referencing_diagram_objects(&self) -> &[NodeHandle] {
        self.back_references(ReferenceSlot::Element)
    }

    pub fn referencing_diagram_connections(&self) -> &[NodeHandle] {
        self.back_references(ReferenceSlot::Relationship)
    }

    pub fn target_connections(&self) -> &[NodeHandle] {
        self.back_references(ReferenceSlot::ConnectionTarget)
    }

    /// Child folders of the model root or a folder.
    pub fn folders(&self) -> &[NodeHandle] {
        match &self.body {
            NodeBody::Model { folders } | NodeBody::Folder { folders, .. } => folders,
            _ => &[],
        }
    }

    /// Elements, relationships and views directly inside a folder.
    pub fn elements(&self) -> &[NodeHandle] {
        match &self.body {
            NodeBody::Folder { elements, .. } => elements,
            _ => &[],
        }
    }

    /// Diagram objects of a view or composite diagram child.
    pub fn children(&self) -> &[NodeHandle] {
        match &self.body {
            NodeBody::DiagramView { children } | NodeBody::DiagramChild { children, .. } => {
                children
            }
            _ => &[],
        }
    }

    /// Outgoing connections of a diagram object.
    pub fn connections(&self) -> &[NodeHandle] {
        match &self.body {
            NodeBody::DiagramChild { connections, .. }
            | NodeBody::DiagramReference { connections, .. } => connections,
            _ => &[],
        }
    }
}

/// Validate a type tag for use in file names.
///
/// No `_`: leaf files are `<TypeTag>_<id>.xml` and split at the first `_`.
pub(crate) fn validate_type_tag(value: &str) -> Result<(), ModelError> {
    let valid = value.starts_with(|c: char| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidTypeTag {
            value: value.to_string(),
        })
    }
}
