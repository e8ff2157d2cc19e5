//! Callpath Ensemble
//!
//! Combines independently collected performance profiles into one
//! ensemble whose call-path nodes share a single identity.
//!
//! The core pieces:
//! - [`graph`]: arena call graphs and the union arena used to merge them
//! - [`unify`]: folding N graphs into one and flattening the node maps
//! - [`table`]: measurement tables and realignment to unified nodes
//! - [`ensemble`]: stacking and columnar joining, plus validation
//!
//! ## Getting Started
//!
//! ```ignore
//! use callpath_ensemble::ensemble::{stack, ProfileDataset};
//!
//! let datasets: Vec<ProfileDataset> = load_somehow();
//! let ensemble = stack(&datasets, true)?;
//! println!("{}", ensemble.summary());
//! ```
//!
//! The `callpath-ensemble` binary does the same for datasets stored as JSON.

pub mod commands;
pub mod ensemble;
pub mod graph;
pub mod output;
pub mod table;
pub mod unify;
pub mod utils;
