//! In-memory model graph
//!
//! The model is an arena of [`Node`]s addressed by [`NodeHandle`]s:
//! - the root node (kind `Model`) owns the system folders
//! - folders own user folders, elements, relationships and views
//! - views own diagram objects, which own nested objects and connections
//!
//! Forward references live in typed slots holding a [`Reference`].
//! Back-references are derived and only written by the resolver.

mod node;
mod payload;

pub use node::{
    FolderKind, Node, NodeBody, NodeHandle, NodeId, NodeKind, Reference, ReferenceSlot,
    FOLDER_TYPE_TAG, MODEL_TYPE_TAG,
};
pub use payload::{validate_attribute_name, Payload, Property, RESERVED_ATTRIBUTES};

use std::ops::Index;

use thiserror::Error;

use node::validate_type_tag;

use crate::naming;

/// Errors raised while building or editing a model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: &'static str },

    #[error("invalid type tag '{value}': use ASCII letters, digits, '-' or '.'")]
    InvalidTypeTag { value: String },

    #[error("user folder id '{id}' would be exported as a node file name")]
    ReservedFolderId { id: NodeId },

    #[error("invalid attribute name '{name}': {reason}")]
    InvalidAttribute { name: String, reason: &'static str },

    #[error("unknown folder kind '{value}'")]
    UnknownFolderKind { value: String },

    #[error("'{kind}' is not a system folder kind")]
    NotSystemKind { kind: FolderKind },

    #[error("the model already has a '{kind}' folder")]
    DuplicateSystemFolder { kind: FolderKind },

    #[error("a {child} cannot be placed inside {parent_kind} '{parent}'")]
    InvalidParent {
        parent: NodeId,
        parent_kind: NodeKind,
        child: NodeKind,
    },

    #[error("node handle {0} does not belong to this model")]
    UnknownHandle(usize),
}

/// An ArchiMate-style model: a folder tree of elements, relationships and views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    nodes: Vec<Node>,
}

impl Model {
    /// Create a model with an empty root.
    pub fn new(id: NodeId, payload: Payload) -> Self {
        let root = Node::new(
            id,
            MODEL_TYPE_TAG.to_string(),
            payload,
            NodeBody::Model {
                folders: Vec::new(),
            },
        );
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    pub fn id(&self) -> &NodeId {
        self.nodes[0].id()
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeHandle(index), node))
    }

    /// System folders in attachment order.
    pub fn folders(&self) -> &[NodeHandle] {
        self.nodes[0].folders()
    }

    pub fn system_folder(&self, kind: FolderKind) -> Option<NodeHandle> {
        self.folders()
            .iter()
            .copied()
            .find(|&handle| self[handle].folder_kind() == Some(kind))
    }

    /// Linear lookup by identifier.
    pub fn find(&self, id: &str) -> Option<NodeHandle> {
        self.iter()
            .find(|(_, node)| node.id().as_str() == id)
            .map(|(handle, _)| handle)
    }

    /// Identifier a reference points at.
    pub fn reference_id<'a>(&'a self, reference: &'a Reference) -> Option<&'a NodeId> {
        match reference {
            Reference::Resolved(handle) => self.get(*handle).map(Node::id),
            Reference::Unresolved(id) => Some(id),
        }
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Attach the single root folder of a system kind.
    pub fn add_system_folder(
        &mut self,
        kind: FolderKind,
        id: NodeId,
        payload: Payload,
    ) -> Result<NodeHandle, ModelError> {
        if !kind.is_system() {
            return Err(ModelError::NotSystemKind { kind });
        }
        if self.system_folder(kind).is_some() {
            return Err(ModelError::DuplicateSystemFolder { kind });
        }
        let node = Node::new(id, FOLDER_TYPE_TAG.to_string(), payload, folder_body(kind));
        self.insert(self.root(), node)
    }

    /// Create a user folder inside another folder.
    pub fn add_user_folder(
        &mut self,
        parent: NodeHandle,
        id: NodeId,
        payload: Payload,
    ) -> Result<NodeHandle, ModelError> {
        self.expect_parent(parent, NodeKind::Folder, NodeKind::Folder)?;
        if naming::is_node_file_name(id.as_str()) {
            return Err(ModelError::ReservedFolderId { id });
        }
        let node = Node::new(
            id,
            FOLDER_TYPE_TAG.to_string(),
            payload,
            folder_body(FolderKind::User),
        );
        self.insert(parent, node)
    }

    pub fn add_element(
        &mut self,
        folder: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::Element {
            referencing_diagram_objects: Vec::new(),
        };
        self.insert_tagged(folder, id, type_tag, payload, body)
    }

    pub fn add_relationship(
        &mut self,
        folder: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
        source: Option<Reference>,
        target: Option<Reference>,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::Relationship {
            source,
            target,
            referencing_diagram_connections: Vec::new(),
        };
        self.insert_tagged(folder, id, type_tag, payload, body)
    }

    pub fn add_view(
        &mut self,
        folder: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::DiagramView {
            children: Vec::new(),
        };
        self.insert_tagged(folder, id, type_tag, payload, body)
    }

    /// Place a diagram object in a view or composite diagram object.
    pub fn add_diagram_object(
        &mut self,
        container: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
        element: Option<Reference>,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::DiagramChild {
            element,
            children: Vec::new(),
            connections: Vec::new(),
            target_connections: Vec::new(),
        };
        self.insert_tagged(container, id, type_tag, payload, body)
    }

    /// Place a reference to another view in a view or composite diagram object.
    pub fn add_diagram_reference(
        &mut self,
        container: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
        view: Option<Reference>,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::DiagramReference {
            view,
            connections: Vec::new(),
            target_connections: Vec::new(),
        };
        self.insert_tagged(container, id, type_tag, payload, body)
    }

    /// Add an outgoing connection to a diagram object.
    pub fn add_connection(
        &mut self,
        source: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
        relationship: Option<Reference>,
        target: Option<Reference>,
    ) -> Result<NodeHandle, ModelError> {
        let body = NodeBody::DiagramConnection {
            relationship,
            target,
        };
        self.insert_tagged(source, id, type_tag, payload, body)
    }

    fn insert_tagged(
        &mut self,
        parent: NodeHandle,
        id: NodeId,
        type_tag: &str,
        payload: Payload,
        body: NodeBody,
    ) -> Result<NodeHandle, ModelError> {
        validate_type_tag(type_tag)?;
        self.insert(parent, Node::new(id, type_tag.to_string(), payload, body))
    }

    fn expect_parent(
        &self,
        parent: NodeHandle,
        expected: NodeKind,
        child: NodeKind,
    ) -> Result<(), ModelError> {
        let node = self
            .get(parent)
            .ok_or(ModelError::UnknownHandle(parent.0))?;
        if node.kind() == expected {
            Ok(())
        } else {
            Err(ModelError::InvalidParent {
                parent: node.id().clone(),
                parent_kind: node.kind(),
                child,
            })
        }
    }

    fn insert(&mut self, parent: NodeHandle, mut node: Node) -> Result<NodeHandle, ModelError> {
        let handle = NodeHandle(self.nodes.len());
        let child = node.kind();
        let parent_node = self
            .nodes
            .get_mut(parent.0)
            .ok_or(ModelError::UnknownHandle(parent.0))?;
        let parent_kind = parent_node.kind();

        match parent_node.body.child_list_mut(child) {
            Some(list) => list.push(handle),
            None => {
                return Err(ModelError::InvalidParent {
                    parent: parent_node.id.clone(),
                    parent_kind,
                    child,
                })
            }
        }

        node.parent = Some(parent);
        self.nodes.push(node);
        Ok(handle)
    }

    // ========================================================================
    // Traversal and reference maintenance
    // ========================================================================

    /// Depth-first pre-order walk over every node reachable from the root.
    pub fn walk(&self) -> Vec<NodeHandle> {
        self.subtree(self.root())
    }

    /// Depth-first pre-order walk starting at `start`.
    ///
    /// Folders visit subfolders before elements; diagram objects visit nested
    /// objects before their connections.
    pub fn subtree(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut visited = Vec::new();
        let mut stack = vec![start];

        while let Some(handle) = stack.pop() {
            let Some(node) = self.get(handle) else {
                continue;
            };
            visited.push(handle);

            let mut next: Vec<NodeHandle> = Vec::new();
            match node.body() {
                NodeBody::Model { folders } => next.extend(folders),
                NodeBody::Folder {
                    folders, elements, ..
                } => {
                    next.extend(folders);
                    next.extend(elements);
                }
                NodeBody::DiagramView { children } => next.extend(children),
                NodeBody::DiagramChild {
                    children,
                    connections,
                    ..
                } => {
                    next.extend(children);
                    next.extend(connections);
                }
                NodeBody::DiagramReference { connections, .. } => next.extend(connections),
                NodeBody::Element { .. }
                | NodeBody::Relationship { .. }
                | NodeBody::DiagramConnection { .. } => {}
            }
            stack.extend(next.into_iter().rev());
        }

        visited
    }

    /// Overwrite a forward reference slot. Returns false if the node has no such slot.
    pub(crate) fn set_reference(
        &mut self,
        handle: NodeHandle,
        slot: ReferenceSlot,
        reference: Reference,
    ) -> bool {
        match self
            .nodes
            .get_mut(handle.0)
            .and_then(|node| node.body.slot_mut(slot))
        {
            Some(content) => {
                *content = Some(reference);
                true
            }
            None => false,
        }
    }

    /// Record `source` in the back-reference collection of `target` matching `slot`.
    ///
    /// Each (source, target) pair is recorded at most once. Returns true when
    /// a new entry was added.
    pub(crate) fn register_back_reference(
        &mut self,
        target: NodeHandle,
        slot: ReferenceSlot,
        source: NodeHandle,
    ) -> bool {
        let Some(collection) = self
            .nodes
            .get_mut(target.0)
            .and_then(|node| node.body.back_references_mut(slot))
        else {
            return false;
        };

        if collection.contains(&source) {
            return false;
        }
        collection.push(source);
        true
    }
}

impl Index<NodeHandle> for Model {
    type Output = Node;

    fn index(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.0]
    }
}

fn folder_body(folder_kind: FolderKind) -> NodeBody {
    NodeBody::Folder {
        folder_kind,
        folders: Vec::new(),
        elements: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> NodeId {
        NodeId::new(value).unwrap()
    }

    fn sample() -> (Model, NodeHandle, NodeHandle) {
        let mut model = Model::new(id("m1"), Payload::named("Sample"));
        let business = model
            .add_system_folder(FolderKind::Business, id("f-business"), Payload::named("Business"))
            .unwrap();
        let diagrams = model
            .add_system_folder(FolderKind::Diagrams, id("f-diagrams"), Payload::named("Views"))
            .unwrap();
        (model, business, diagrams)
    }

    #[test]
    fn test_system_folder_is_unique() {
        let (mut model, _, _) = sample();
        let err = model
            .add_system_folder(FolderKind::Business, id("f-other"), Payload::new())
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateSystemFolder {
                kind: FolderKind::Business
            }
        );
    }

    #[test]
    fn test_user_kind_is_not_a_system_folder() {
        let (mut model, _, _) = sample();
        assert!(matches!(
            model.add_system_folder(FolderKind::User, id("u"), Payload::new()),
            Err(ModelError::NotSystemKind { .. })
        ));
    }

    #[test]
    fn test_user_folder_requires_folder_parent() {
        let (mut model, business, _) = sample();
        let root = model.root();
        assert!(model.add_user_folder(root, id("u1"), Payload::new()).is_err());

        let nested = model.add_user_folder(business, id("u1"), Payload::new()).unwrap();
        assert_eq!(model[nested].folder_kind(), Some(FolderKind::User));
        assert_eq!(model[nested].parent(), Some(business));
    }

    #[test]
    fn test_user_folder_id_cannot_look_like_a_node_file() {
        let (mut model, business, _) = sample();
        for reserved in ["folder.xml", "BusinessActor_e1.xml", "Notes.XML"] {
            let err = model
                .add_user_folder(business, id(reserved), Payload::new())
                .unwrap_err();
            assert_eq!(err, ModelError::ReservedFolderId { id: id(reserved) });
        }
        assert!(model
            .add_user_folder(business, id("xml-notes"), Payload::new())
            .is_ok());
    }

    #[test]
    fn test_invalid_parent_is_rejected() {
        let (mut model, business, _) = sample();
        let actor = model
            .add_element(business, id("e1"), "BusinessActor", Payload::named("Actor"))
            .unwrap();
        let err = model
            .add_element(actor, id("e2"), "BusinessRole", Payload::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParent { .. }));
    }

    #[test]
    fn test_walk_visits_every_node_in_order() {
        let (mut model, business, diagrams) = sample();
        let sub = model.add_user_folder(business, id("u1"), Payload::new()).unwrap();
        let actor = model
            .add_element(business, id("e1"), "BusinessActor", Payload::new())
            .unwrap();
        model
            .add_element(sub, id("e2"), "BusinessRole", Payload::new())
            .unwrap();
        let view = model
            .add_view(diagrams, id("v1"), "ArchimateDiagramModel", Payload::new())
            .unwrap();
        let child = model
            .add_diagram_object(view, id("d1"), "DiagramObject", Payload::new(), Some(Reference::Resolved(actor)))
            .unwrap();
        model
            .add_connection(child, id("c1"), "Connection", Payload::new(), None, None)
            .unwrap();

        let order: Vec<_> = model
            .walk()
            .into_iter()
            .map(|handle| model[handle].id().to_string())
            .collect();
        assert_eq!(
            order,
            vec!["m1", "f-business", "u1", "e2", "e1", "f-diagrams", "v1", "d1", "c1"]
        );
        assert_eq!(model.walk().len(), model.node_count());
    }

    #[test]
    fn test_register_back_reference_is_idempotent() {
        let (mut model, business, diagrams) = sample();
        let actor = model
            .add_element(business, id("e1"), "BusinessActor", Payload::new())
            .unwrap();
        let view = model
            .add_view(diagrams, id("v1"), "ArchimateDiagramModel", Payload::new())
            .unwrap();
        let child = model
            .add_diagram_object(view, id("d1"), "DiagramObject", Payload::new(), None)
            .unwrap();

        assert!(model.register_back_reference(actor, ReferenceSlot::Element, child));
        assert!(!model.register_back_reference(actor, ReferenceSlot::Element, child));
        assert_eq!(model[actor].referencing_diagram_objects(), &[child]);

        // Relationship endpoints carry no back-reference collection.
        assert!(!model.register_back_reference(actor, ReferenceSlot::Source, child));
    }

    #[test]
    fn test_reference_id() {
        let (mut model, business, _) = sample();
        let actor = model
            .add_element(business, id("e1"), "BusinessActor", Payload::new())
            .unwrap();
        let resolved = Reference::Resolved(actor);
        let placeholder = Reference::Unresolved(id("missing"));
        assert_eq!(model.reference_id(&resolved).unwrap().as_str(), "e1");
        assert_eq!(model.reference_id(&placeholder).unwrap().as_str(), "missing");
        assert!(model
            .reference_id(&Reference::Resolved(NodeHandle(99)))
            .is_none());
    }
}
