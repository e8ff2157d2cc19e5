//! Call graphs, structural frames and pairwise union.
//!
//! This module provides:
//! - `Frame`, the attribute set that decides node equivalence
//! - `CallGraph`, an arena graph with traversal-order ordinals
//! - `UnionArena`, the incremental union used by the unifier

pub mod callgraph;
pub mod frame;
pub mod union;

// Re-export main types
pub use callgraph::{CallGraph, CallGraphBuilder, CallPathNode, NodeId, NodeMap};
pub use frame::{Frame, FRAME_NAME};
pub use union::UnionArena;
