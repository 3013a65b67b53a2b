//! Mapping between nodes and XML elements.
//!
//! Only payloads and forward references are encoded; references are written
//! as the bare identifier of their target. Decoding produces
//! [`Reference::Unresolved`] placeholders for every populated slot.

use thiserror::Error;

use crate::model::{
    FolderKind, Model, ModelError, Node, NodeHandle, NodeId, NodeKind, Payload, Reference,
    ReferenceSlot,
};
use crate::xml::XmlElement;

/// Element names used in node files.
pub mod tag {
    pub const MODEL: &str = "model";
    pub const FOLDER: &str = "folder";
    pub const ELEMENT: &str = "element";
    pub const RELATIONSHIP: &str = "relationship";
    pub const VIEW: &str = "view";
    pub const CHILD: &str = "child";
    pub const REFERENCE: &str = "reference";
    pub const CONNECTION: &str = "connection";
    pub const DOCUMENTATION: &str = "documentation";
    pub const PROPERTY: &str = "property";
}

const ATTR_ID: &str = "id";
const ATTR_TYPE: &str = "type";
const ATTR_NAME: &str = "name";
const ATTR_KEY: &str = "key";
const ATTR_VALUE: &str = "value";

/// Errors raised while converting between nodes and XML elements.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected <{found}>, expected {expected}")]
    UnexpectedElement {
        found: String,
        expected: &'static str,
    },

    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("{kind} '{id}' has a reference to a node outside this model")]
    ForeignHandle { kind: NodeKind, id: NodeId },

    #[error("{kind} '{id}' cannot be written as a separate file")]
    NotALeaf { kind: NodeKind, id: NodeId },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Decoded model descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: NodeId,
    pub payload: Payload,
}

/// Decoded folder descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDescriptor {
    pub id: NodeId,
    pub kind: FolderKind,
    pub payload: Payload,
}

// ============================================================================
// Encoding
// ============================================================================

/// `<model>` element for `model/folder.xml`.
pub fn encode_model_descriptor(model: &Model) -> XmlElement {
    let node = &model[model.root()];
    let mut element = XmlElement::new(tag::MODEL).with_attr(ATTR_ID, node.id().as_str());
    encode_payload(&mut element, node.payload());
    element
}

/// `<folder>` element for a folder's `folder.xml`. Subfolders and elements
/// are stored in their own files.
pub fn encode_folder_descriptor(node: &Node) -> Option<XmlElement> {
    let kind = node.folder_kind()?;
    let mut element = XmlElement::new(tag::FOLDER)
        .with_attr(ATTR_TYPE, kind.as_str())
        .with_attr(ATTR_ID, node.id().as_str());
    encode_payload(&mut element, node.payload());
    Some(element)
}

/// Element for an element, relationship or view file, including the whole
/// diagram subtree of a view.
pub fn encode_leaf(model: &Model, handle: NodeHandle) -> Result<XmlElement, CodecError> {
    let node = &model[handle];
    let name = match node.kind() {
        NodeKind::Element => tag::ELEMENT,
        NodeKind::Relationship => tag::RELATIONSHIP,
        NodeKind::DiagramView => tag::VIEW,
        kind => {
            return Err(CodecError::NotALeaf {
                kind,
                id: node.id().clone(),
            })
        }
    };

    let mut element = encode_node(model, node, name)?;
    for &child in node.children() {
        element.push_child(encode_diagram_node(model, child)?);
    }
    Ok(element)
}

fn encode_diagram_node(model: &Model, handle: NodeHandle) -> Result<XmlElement, CodecError> {
    let node = &model[handle];
    let name = match node.kind() {
        NodeKind::DiagramChild => tag::CHILD,
        NodeKind::DiagramReference => tag::REFERENCE,
        NodeKind::DiagramConnection => tag::CONNECTION,
        kind => {
            return Err(CodecError::UnexpectedElement {
                found: kind.as_str().to_string(),
                expected: "a diagram object",
            })
        }
    };

    let mut element = encode_node(model, node, name)?;
    for &child in node.children().iter().chain(node.connections()) {
        element.push_child(encode_diagram_node(model, child)?);
    }
    Ok(element)
}

/// Identity, references and payload of one node, without nested nodes.
fn encode_node(model: &Model, node: &Node, name: &str) -> Result<XmlElement, CodecError> {
    let mut element = XmlElement::new(name)
        .with_attr(ATTR_TYPE, node.type_tag())
        .with_attr(ATTR_ID, node.id().as_str());
    if let Some(value) = node.payload().name() {
        element.push_attr(ATTR_NAME, value);
    }

    for (slot, reference) in node.forward_references() {
        let target = model
            .reference_id(reference)
            .ok_or_else(|| CodecError::ForeignHandle {
                kind: node.kind(),
                id: node.id().clone(),
            })?;
        element.push_attr(slot.attribute(), target.as_str());
    }

    encode_payload_body(&mut element, node.payload());
    Ok(element)
}

fn encode_payload(element: &mut XmlElement, payload: &Payload) {
    if let Some(value) = payload.name() {
        element.push_attr(ATTR_NAME, value);
    }
    encode_payload_body(element, payload);
}

/// Payload attributes, documentation and properties.
fn encode_payload_body(element: &mut XmlElement, payload: &Payload) {
    for (key, value) in payload.attributes() {
        element.push_attr(key, value);
    }
    if let Some(text) = payload.documentation() {
        element.push_child(XmlElement::new(tag::DOCUMENTATION).with_text(text));
    }
    for property in payload.properties() {
        element.push_child(
            XmlElement::new(tag::PROPERTY)
                .with_attr(ATTR_KEY, property.key.as_str())
                .with_attr(ATTR_VALUE, property.value.as_str()),
        );
    }
}

// ============================================================================
// Decoding
// ============================================================================

pub fn decode_model_descriptor(element: &XmlElement) -> Result<ModelDescriptor, CodecError> {
    expect_name(element, tag::MODEL, "<model>")?;
    let id = required_id(element)?;
    let payload = decode_payload(element, &[])?;
    reject_nested(element)?;
    Ok(ModelDescriptor { id, payload })
}

pub fn decode_folder_descriptor(element: &XmlElement) -> Result<FolderDescriptor, CodecError> {
    expect_name(element, tag::FOLDER, "<folder>")?;
    let kind = required(element, ATTR_TYPE)?.parse::<FolderKind>()?;
    let id = required_id(element)?;
    let payload = decode_payload(element, &[ATTR_TYPE])?;
    reject_nested(element)?;
    Ok(FolderDescriptor { id, kind, payload })
}

/// Decode an element, relationship or view file into `folder`.
pub fn decode_leaf(
    model: &mut Model,
    folder: NodeHandle,
    element: &XmlElement,
) -> Result<NodeHandle, CodecError> {
    let id = required_id(element)?;
    let type_tag = required(element, ATTR_TYPE)?;

    match element.name.as_str() {
        tag::ELEMENT => {
            let payload = decode_payload(element, &[ATTR_TYPE])?;
            reject_nested(element)?;
            Ok(model.add_element(folder, id, type_tag, payload)?)
        }
        tag::RELATIONSHIP => {
            let source = placeholder(element, ReferenceSlot::Source)?;
            let target = placeholder(element, ReferenceSlot::Target)?;
            let payload = decode_payload(element, &[ATTR_TYPE, "source", "target"])?;
            reject_nested(element)?;
            Ok(model.add_relationship(folder, id, type_tag, payload, source, target)?)
        }
        tag::VIEW => {
            let payload = decode_payload(element, &[ATTR_TYPE])?;
            let view = model.add_view(folder, id, type_tag, payload)?;
            decode_nested(model, view, element)?;
            Ok(view)
        }
        _ => Err(CodecError::UnexpectedElement {
            found: element.name.clone(),
            expected: "<element>, <relationship> or <view>",
        }),
    }
}

/// Decode the diagram objects and connections nested in `element` into `parent`.
fn decode_nested(
    model: &mut Model,
    parent: NodeHandle,
    element: &XmlElement,
) -> Result<(), CodecError> {
    for child in nested_elements(element) {
        let id = required_id(child)?;
        let type_tag = required(child, ATTR_TYPE)?;

        match child.name.as_str() {
            tag::CHILD => {
                let target = placeholder(child, ReferenceSlot::Element)?;
                let payload = decode_payload(child, &[ATTR_TYPE, "element"])?;
                let handle = model.add_diagram_object(parent, id, type_tag, payload, target)?;
                decode_nested(model, handle, child)?;
            }
            tag::REFERENCE => {
                let view = placeholder(child, ReferenceSlot::View)?;
                let payload = decode_payload(child, &[ATTR_TYPE, "view"])?;
                let handle = model.add_diagram_reference(parent, id, type_tag, payload, view)?;
                decode_nested(model, handle, child)?;
            }
            tag::CONNECTION => {
                let relationship = placeholder(child, ReferenceSlot::Relationship)?;
                let target = placeholder(child, ReferenceSlot::ConnectionTarget)?;
                let payload = decode_payload(child, &[ATTR_TYPE, "relationship", "target"])?;
                model.add_connection(parent, id, type_tag, payload, relationship, target)?;
                reject_nested(child)?;
            }
            _ => {
                return Err(CodecError::UnexpectedElement {
                    found: child.name.clone(),
                    expected: "<child>, <reference> or <connection>",
                })
            }
        }
    }
    Ok(())
}

/// Payload of `element`. `consumed` lists the attributes already read as
/// identity or references; `id` and `name` are always consumed.
fn decode_payload(element: &XmlElement, consumed: &[&str]) -> Result<Payload, CodecError> {
    let mut payload = Payload::new();
    payload.set_name(element.attr(ATTR_NAME).map(str::to_string));

    for (key, value) in &element.attributes {
        let key = key.as_str();
        if key == ATTR_ID || key == ATTR_NAME || consumed.contains(&key) {
            continue;
        }
        payload.set_attribute(key, value.as_str())?;
    }

    for child in &element.children {
        match child.name.as_str() {
            tag::DOCUMENTATION => payload.set_documentation(child.text.clone()),
            tag::PROPERTY => {
                let key = required(child, ATTR_KEY)?;
                payload.push_property(key, child.attr(ATTR_VALUE).unwrap_or_default());
            }
            _ => {}
        }
    }

    Ok(payload)
}

/// Child elements that are nodes rather than payload.
fn nested_elements(element: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    element
        .children
        .iter()
        .filter(|child| child.name != tag::DOCUMENTATION && child.name != tag::PROPERTY)
}

fn reject_nested(element: &XmlElement) -> Result<(), CodecError> {
    match nested_elements(element).next() {
        Some(child) => Err(CodecError::UnexpectedElement {
            found: child.name.clone(),
            expected: "only <documentation> and <property> children",
        }),
        None => Ok(()),
    }
}

fn placeholder(
    element: &XmlElement,
    slot: ReferenceSlot,
) -> Result<Option<Reference>, CodecError> {
    match element.attr(slot.attribute()) {
        Some(value) => Ok(Some(Reference::Unresolved(NodeId::new(value)?))),
        None => Ok(None),
    }
}

fn expect_name(
    element: &XmlElement,
    name: &str,
    expected: &'static str,
) -> Result<(), CodecError> {
    if element.name == name {
        Ok(())
    } else {
        Err(CodecError::UnexpectedElement {
            found: element.name.clone(),
            expected,
        })
    }
}

fn required<'a>(element: &'a XmlElement, attribute: &'static str) -> Result<&'a str, CodecError> {
    element
        .attr(attribute)
        .ok_or_else(|| CodecError::MissingAttribute {
            element: element.name.clone(),
            attribute,
        })
}

fn required_id(element: &XmlElement) -> Result<NodeId, CodecError> {
    Ok(NodeId::new(required(element, ATTR_ID)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(value: &str) -> NodeId {
        NodeId::new(value).unwrap()
    }

    fn model_with_view() -> (Model, NodeHandle, NodeHandle, NodeHandle) {
        let mut model = Model::new(id("m1"), Payload::named("Model"));
        let business = model
            .add_system_folder(FolderKind::Business, id("fb"), Payload::named("Business"))
            .unwrap();
        let relations = model
            .add_system_folder(FolderKind::Relations, id("fr"), Payload::named("Relations"))
            .unwrap();
        let diagrams = model
            .add_system_folder(FolderKind::Diagrams, id("fd"), Payload::named("Views"))
            .unwrap();

        let actor = model
            .add_element(
                business,
                id("e1"),
                "BusinessActor",
                Payload::named("Customer")
                    .with_documentation("Buys things")
                    .with_property("owner", "sales"),
            )
            .unwrap();
        let role = model
            .add_element(business, id("e2"), "BusinessRole", Payload::named("Buyer"))
            .unwrap();
        let rel = model
            .add_relationship(
                relations,
                id("r1"),
                "AssignmentRelationship",
                Payload::new(),
                Some(Reference::Resolved(actor)),
                Some(Reference::Resolved(role)),
            )
            .unwrap();

        let view = model
            .add_view(diagrams, id("v1"), "ArchimateDiagramModel", Payload::named("Main"))
            .unwrap();
        let first = model
            .add_diagram_object(
                view,
                id("d1"),
                "DiagramObject",
                Payload::new().with_attribute("x", "10").unwrap(),
                Some(Reference::Resolved(actor)),
            )
            .unwrap();
        let second = model
            .add_diagram_object(view, id("d2"), "DiagramObject", Payload::new(), Some(Reference::Resolved(role)))
            .unwrap();
        model
            .add_connection(
                first,
                id("c1"),
                "Connection",
                Payload::new(),
                Some(Reference::Resolved(rel)),
                Some(Reference::Resolved(second)),
            )
            .unwrap();

        (model, business, rel, view)
    }

    #[test]
    fn test_encode_relationship_writes_bare_ids() {
        let (model, _, rel, _) = model_with_view();
        let element = encode_leaf(&model, rel).unwrap();
        assert_eq!(element.name, "relationship");
        assert_eq!(
            element.attributes,
            vec![
                ("type".to_string(), "AssignmentRelationship".to_string()),
                ("id".to_string(), "r1".to_string()),
                ("source".to_string(), "e1".to_string()),
                ("target".to_string(), "e2".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_view_nests_connections_under_source() {
        let (model, _, _, view) = model_with_view();
        let element = encode_leaf(&model, view).unwrap();
        assert_eq!(element.children.len(), 2);
        let first = &element.children[0];
        assert_eq!(first.attr("element"), Some("e1"));
        assert_eq!(first.attr("x"), Some("10"));
        assert_eq!(first.children[0].name, "connection");
        assert_eq!(first.children[0].attr("relationship"), Some("r1"));
        assert_eq!(first.children[0].attr("target"), Some("d2"));
    }

    #[test]
    fn test_folder_cannot_be_a_leaf() {
        let (model, business, _, _) = model_with_view();
        assert!(matches!(
            encode_leaf(&model, business),
            Err(CodecError::NotALeaf { .. })
        ));
    }

    #[test]
    fn test_decode_leaf_creates_placeholders() {
        let (model, _, _, view) = model_with_view();
        let encoded = encode_leaf(&model, view).unwrap();

        let mut fresh = Model::new(id("m1"), Payload::new());
        let diagrams = fresh
            .add_system_folder(FolderKind::Diagrams, id("fd"), Payload::new())
            .unwrap();
        let decoded = decode_leaf(&mut fresh, diagrams, &encoded).unwrap();

        assert_eq!(fresh[decoded].kind(), NodeKind::DiagramView);
        assert_eq!(fresh[decoded].payload().name(), Some("Main"));
        let first = fresh[decoded].children()[0];
        assert_eq!(
            fresh[first].reference(ReferenceSlot::Element),
            Some(&Reference::Unresolved(id("e1")))
        );
        let connection = fresh[first].connections()[0];
        assert_eq!(
            fresh[connection].reference(ReferenceSlot::ConnectionTarget),
            Some(&Reference::Unresolved(id("d2")))
        );
        assert!(fresh[first].referencing_diagram_objects().is_empty());
    }

    #[test]
    fn test_payload_round_trip() {
        let (model, business, _, _) = model_with_view();
        let actor = model[business].elements()[0];
        let encoded = encode_leaf(&model, actor).unwrap();

        let mut fresh = Model::new(id("m1"), Payload::new());
        let folder = fresh
            .add_system_folder(FolderKind::Business, id("fb"), Payload::new())
            .unwrap();
        let decoded = decode_leaf(&mut fresh, folder, &encoded).unwrap();
        assert_eq!(fresh[decoded].payload(), model[actor].payload());
        assert_eq!(fresh[decoded].type_tag(), "BusinessActor");
    }

    #[test]
    fn test_folder_descriptor() {
        let (model, business, _, _) = model_with_view();
        let element = encode_folder_descriptor(&model[business]).unwrap();
        assert_eq!(element.attr("type"), Some("business"));

        let descriptor = decode_folder_descriptor(&element).unwrap();
        assert_eq!(descriptor.kind, FolderKind::Business);
        assert_eq!(descriptor.id, id("fb"));
        assert_eq!(descriptor.payload.name(), Some("Business"));
    }

    #[test]
    fn test_model_descriptor() {
        let (model, _, _, _) = model_with_view();
        let element = encode_model_descriptor(&model);
        assert_eq!(element.name, "model");
        let descriptor = decode_model_descriptor(&element).unwrap();
        assert_eq!(descriptor.id, id("m1"));
        assert_eq!(descriptor.payload.name(), Some("Model"));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let mut model = Model::new(id("m1"), Payload::new());
        let folder = model
            .add_system_folder(FolderKind::Business, id("fb"), Payload::new())
            .unwrap();

        let missing_id = XmlElement::new("element").with_attr("type", "BusinessActor");
        assert!(matches!(
            decode_leaf(&mut model, folder, &missing_id),
            Err(CodecError::MissingAttribute { attribute: "id", .. })
        ));

        let unknown = XmlElement::new("widget")
            .with_attr("type", "X")
            .with_attr("id", "w1");
        assert!(matches!(
            decode_leaf(&mut model, folder, &unknown),
            Err(CodecError::UnexpectedElement { .. })
        ));

        let bad_kind = XmlElement::new("folder")
            .with_attr("type", "sales")
            .with_attr("id", "f1");
        assert!(decode_folder_descriptor(&bad_kind).is_err());

        let reserved = XmlElement::new("element")
            .with_attr("type", "BusinessActor")
            .with_attr("id", "e9")
            .with_attr("source", "e1");
        assert!(matches!(
            decode_leaf(&mut model, folder, &reserved),
            Err(CodecError::Model(ModelError::InvalidAttribute { .. }))
        ));
    }
}
