//! Graph unification and node-identity propagation.
//!
//! `GraphUnifier` folds N graphs into one; `NodeRemapPropagator` turns the
//! fold's bookkeeping into one old → new `NodeMap` per input dataset.

mod remap;
mod unifier;

pub use remap::NodeRemapPropagator;
pub use unifier::{GraphUnifier, Unification};
