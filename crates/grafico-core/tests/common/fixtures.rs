//! Sample models for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use grafico_core::{
    BlobStore, FolderKind, MemoryBlobStore, Model, NodeId, Payload, Reference,
};
use tempfile::TempDir;

pub fn id(value: &str) -> NodeId {
    NodeId::new(value).expect("valid test id")
}

pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("grafico-test-")
        .tempdir()
        .expect("Failed to create temp dir")
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, contents).expect("Failed to write file");
}

fn with_image(payload: Payload, path: &str) -> Payload {
    payload
        .with_attribute("imagePath", path)
        .expect("valid attribute")
}

/// A model touching every node kind and every reference slot.
///
/// Layout:
/// - Business: user folder `u-customers` holding `e-customer`, plus `e-process`
/// - Application: `e-app`, `e-db`
/// - Relations: `r-assign`, `r-serves`, and `r-meta` pointing at `r-serves`
/// - Diagrams: `v-main` (nested objects, connections, a view reference) and `v-detail`
///
/// `images/customer.png` is referenced three times; `images/unused.png` is never referenced.
pub fn sample_model() -> (Model, MemoryBlobStore) {
    let mut model = Model::new(
        id("m1"),
        Payload::named("Sample Enterprise")
            .with_documentation("Reference model for round trips")
            .with_property("owner", "architecture")
            .with_property("owner", "security"),
    );

    let business = model
        .add_system_folder(FolderKind::Business, id("f-business"), Payload::named("Business"))
        .unwrap();
    let customers = model
        .add_user_folder(
            business,
            id("u-customers"),
            Payload::named("Customers").with_documentation("Everyone who pays"),
        )
        .unwrap();
    let customer = model
        .add_element(
            customers,
            id("e-customer"),
            "BusinessActor",
            with_image(Payload::named("Customer"), "images/customer.png"),
        )
        .unwrap();
    let process = model
        .add_element(
            business,
            id("e-process"),
            "BusinessProcess",
            Payload::named("Handle Claim & <Pay>")
                .with_documentation("  Line one\nline two with \"quotes\" & 'apostrophes'  ")
                .with_property("sla", "48h")
                .with_property("note", "a < b"),
        )
        .unwrap();

    let application = model
        .add_system_folder(
            FolderKind::Application,
            id("f-application"),
            Payload::named("Application"),
        )
        .unwrap();
    let app = model
        .add_element(
            application,
            id("e-app"),
            "ApplicationComponent",
            with_image(Payload::named("Claims App"), "images/customer.png"),
        )
        .unwrap();
    let database = model
        .add_element(
            application,
            id("e-db"),
            "DataObject",
            with_image(Payload::named("Claims DB"), "images/icons/app.png"),
        )
        .unwrap();

    let relations = model
        .add_system_folder(FolderKind::Relations, id("f-relations"), Payload::named("Relations"))
        .unwrap();
    let assign = model
        .add_relationship(
            relations,
            id("r-assign"),
            "AssignmentRelationship",
            Payload::new(),
            Some(Reference::Resolved(customer)),
            Some(Reference::Resolved(process)),
        )
        .unwrap();
    let serves = model
        .add_relationship(
            relations,
            id("r-serves"),
            "ServingRelationship",
            Payload::new(),
            Some(Reference::Resolved(app)),
            Some(Reference::Resolved(process)),
        )
        .unwrap();
    model
        .add_relationship(
            relations,
            id("r-meta"),
            "AssociationRelationship",
            Payload::named("stores")
                .with_attribute("directed", "true")
                .unwrap(),
            Some(Reference::Resolved(serves)),
            Some(Reference::Resolved(database)),
        )
        .unwrap();

    let diagrams = model
        .add_system_folder(FolderKind::Diagrams, id("f-diagrams"), Payload::named("Views"))
        .unwrap();
    let main = model
        .add_view(diagrams, id("v-main"), "ArchimateDiagramModel", Payload::named("Main"))
        .unwrap();
    let detail = model
        .add_view(
            diagrams,
            id("v-detail"),
            "ArchimateDiagramModel",
            Payload::named("Detail"),
        )
        .unwrap();

    let position = |x: &str, y: &str| {
        Payload::new()
            .with_attribute("x", x)
            .unwrap()
            .with_attribute("y", y)
            .unwrap()
    };
    let customer_box = model
        .add_diagram_object(
            main,
            id("d-customer"),
            "DiagramObject",
            with_image(position("10", "10"), "images/customer.png"),
            Some(Reference::Resolved(customer)),
        )
        .unwrap();
    let process_box = model
        .add_diagram_object(
            customer_box,
            id("d-process"),
            "DiagramObject",
            position("20", "40"),
            Some(Reference::Resolved(process)),
        )
        .unwrap();
    let app_box = model
        .add_diagram_object(
            main,
            id("d-app"),
            "DiagramObject",
            position("200", "10"),
            Some(Reference::Resolved(app)),
        )
        .unwrap();
    let detail_ref = model
        .add_diagram_reference(
            main,
            id("d-detail-ref"),
            "DiagramModelReference",
            position("400", "10"),
            Some(Reference::Resolved(detail)),
        )
        .unwrap();
    model
        .add_connection(
            customer_box,
            id("c-assign"),
            "Connection",
            Payload::new(),
            Some(Reference::Resolved(assign)),
            Some(Reference::Resolved(process_box)),
        )
        .unwrap();
    model
        .add_connection(
            app_box,
            id("c-serves"),
            "Connection",
            Payload::named("serves"),
            Some(Reference::Resolved(serves)),
            Some(Reference::Resolved(process_box)),
        )
        .unwrap();
    model
        .add_connection(
            app_box,
            id("c-to-detail"),
            "Connection",
            Payload::new(),
            None,
            Some(Reference::Resolved(detail_ref)),
        )
        .unwrap();
    model
        .add_diagram_object(
            detail,
            id("d-db"),
            "DiagramObject",
            position("0", "0"),
            Some(Reference::Resolved(database)),
        )
        .unwrap();

    let mut blobs = MemoryBlobStore::new();
    blobs.put_blob("images/customer.png", b"\x89PNG customer".to_vec());
    blobs.put_blob("images/icons/app.png", b"\x89PNG app".to_vec());
    blobs.put_blob("images/unused.png", b"\x89PNG unused".to_vec());

    (model, blobs)
}

/// [`sample_model`] plus `e-legacy` in Application and its image.
pub fn extended_model() -> (Model, MemoryBlobStore) {
    let (mut model, mut blobs) = sample_model();
    let application = model
        .system_folder(FolderKind::Application)
        .expect("sample has an application folder");
    model
        .add_element(
            application,
            id("e-legacy"),
            "ApplicationComponent",
            with_image(Payload::named("Mainframe"), "images/legacy.png"),
        )
        .unwrap();
    blobs.put_blob("images/legacy.png", b"\x89PNG legacy".to_vec());
    (model, blobs)
}
