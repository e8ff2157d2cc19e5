//! Persistence for datasets and ensembles.
//!
//! This module handles writing data to disk and reading it back:
//! - JSON datasets (inputs to composition)
//! - JSON ensembles, stacked or joined, validated again on read

pub mod json;

// Re-export main functions
pub use json::{
    read_dataset, read_ensemble, read_header, read_joined, read_stacked, write_dataset, write_ensemble,
    EnsembleLayout, FileHeader, PayloadKind,
};
