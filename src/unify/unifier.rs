//! Fold N call graphs into one union graph.

use crate::graph::{CallGraph, NodeId, UnionArena};
use crate::utils::error::EnsembleError;
use log::{debug, info};
use std::sync::Arc;

/// Result of unifying a list of graphs
///
/// Holds the unified graph plus, per input graph, the slot each original
/// node landed in and the slot → unified node resolution. The two-level
/// lookup is flattened per dataset by the remap propagator.
#[derive(Debug, Clone)]
pub struct Unification {
    graph: Arc<CallGraph>,
    slots: Vec<Vec<NodeId>>,
    resolve: Vec<NodeId>,
    shared: bool,
}

impl Unification {
    pub fn graph(&self) -> &Arc<CallGraph> {
        &self.graph
    }

    /// Number of input graphs
    pub fn input_count(&self) -> usize {
        self.slots.len()
    }

    /// True when every input was the same graph and nothing was merged
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Unified node that a union-arena slot resolved to
    pub fn resolve(&self, slot: NodeId) -> Option<NodeId> {
        self.resolve.get(slot.index()).copied()
    }

    pub(crate) fn slots_of(&self, input: usize) -> Option<&[NodeId]> {
        self.slots.get(input).map(Vec::as_slice)
    }
}

/// Sequential graph unifier
#[derive(Debug, Clone, Default)]
pub struct GraphUnifier {
    progress: bool,
}

impl GraphUnifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report each folded graph at info level
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Unify `graphs` into one graph
    ///
    /// # Algorithm
    /// 1. If every graph is the same allocation, return it with identity maps
    /// 2. Seed the union arena with graph 0
    /// 3. Absorb graphs 1..N-1 one at a time; absorbing may merge earlier slots
    /// 4. Compact the arena in traversal order
    ///
    /// # Errors
    /// * `EnsembleError::EmptyInput` - no graphs given
    /// * `EnsembleError::StructuralMismatch` - incompatible frames at one position
    pub fn unify(&self, graphs: &[Arc<CallGraph>]) -> Result<Unification, EnsembleError> {
        let first = graphs.first().ok_or(EnsembleError::EmptyInput)?;

        if graphs.iter().all(|g| Arc::ptr_eq(g, first)) {
            debug!("All {} graphs are shared, skipping unification", graphs.len());
            let identity: Vec<NodeId> = first.node_ids().collect();
            return Ok(Unification {
                graph: Arc::clone(first),
                slots: vec![identity.clone(); graphs.len()],
                resolve: identity,
                shared: true,
            });
        }

        let mut arena = UnionArena::new();
        let mut slots = Vec::with_capacity(graphs.len());
        for (index, graph) in graphs.iter().enumerate() {
            slots.push(arena.absorb(graph)?);
            self.report(index + 1, graphs.len(), &arena);
        }

        let (graph, resolve) = arena.finish()?;
        debug!("Unified {} graphs into {} nodes", graphs.len(), graph.len());

        Ok(Unification {
            graph: Arc::new(graph),
            slots,
            resolve,
            shared: false,
        })
    }

    fn report(&self, done: usize, total: usize, arena: &UnionArena) {
        if self.progress {
            info!(
                "Unifying graphs: {}/{} ({} slots, {} merges)",
                done,
                total,
                arena.slot_count(),
                arena.merge_count()
            );
        } else {
            debug!("Absorbed graph {}/{} ({} slots)", done, total, arena.slot_count());
        }
    }
}
