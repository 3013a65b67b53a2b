//! Common test utilities for integration tests.
//!
//! Sample models and graph checks shared across integration test files.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod graph_validator;

// Re-export commonly used items
pub use fixtures::{extended_model, id, sample_model, scratch_dir, write_file};
pub use graph_validator::{
    assert_back_references_consistent, assert_isomorphic, back_reference_count,
    scanned_back_references, stored_back_references, NodeShape,
};
