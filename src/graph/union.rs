//! Pairwise graph union over a growing arena.
//!
//! The union arena accumulates every node seen so far. Absorbing a graph
//! matches it position by position against the arena and records, for each
//! of its nodes, the arena slot it landed in. When a later graph shows that
//! two slots are the same node, the slots are merged in a union-find forest;
//! every recorded slot then resolves through `find` to the merged identity.
//!
//! Each slot remembers which inputs placed a node in it. Two slots that both
//! hold a node of the same input are distinct nodes of that input and are
//! never merged.

use super::callgraph::{traverse_arena, CallGraph, NodeId};
use super::frame::Frame;
use crate::utils::error::EnsembleError;
use log::debug;

/// Union of several call graphs under construction
///
/// Slot ids live in the arena's own id space and are only meaningful
/// together with [`UnionArena::find`].
#[derive(Debug, Clone, Default)]
pub struct UnionArena {
    frames: Vec<Frame>,
    children: Vec<Vec<NodeId>>,
    first_parent: Vec<Option<NodeId>>,
    forest: Vec<NodeId>,
    roots: Vec<NodeId>,
    // Inputs with a node in the slot, kept on representatives
    owners: Vec<Vec<usize>>,
    absorbed: usize,
    merges: usize,
}

impl UnionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, merged or not
    pub fn slot_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of retroactive merges performed so far
    pub fn merge_count(&self) -> usize {
        self.merges
    }

    /// Representative slot of `slot`, compressing the path on the way
    pub fn find(&mut self, slot: NodeId) -> NodeId {
        let mut root = slot;
        while self.forest[root.index()] != root {
            root = self.forest[root.index()];
        }
        let mut current = slot;
        while self.forest[current.index()] != root {
            let next = self.forest[current.index()];
            self.forest[current.index()] = root;
            current = next;
        }
        root
    }

    /// Union `graph` into the arena
    ///
    /// Returns one slot per node of `graph`, indexed by its `NodeId`.
    ///
    /// A node matches an arena node under the same parent when the frames are
    /// equal. A node whose name matches an arena node but whose frame differs
    /// is a structural mismatch, unless the arena node's frame also appears
    /// among the node's own siblings.
    ///
    /// # Errors
    /// * `EnsembleError::StructuralMismatch` - a node takes the position of an
    ///   arena node (same parent, same name) with a different frame
    pub fn absorb(&mut self, graph: &CallGraph) -> Result<Vec<NodeId>, EnsembleError> {
        let input = self.absorbed;
        self.absorbed += 1;

        let mut slots: Vec<Option<NodeId>> = vec![None; graph.len()];
        let mut worklist: Vec<NodeId> = Vec::new();

        let root_frames = frames_of(graph, graph.roots())?;
        for &root in graph.roots() {
            let frame = node_frame(graph, root)?;
            let target = match self.matching_root(frame, &root_frames)? {
                Some(existing) if !self.owned_by(existing, input) => existing,
                _ => self.push(frame.clone(), None),
            };
            self.bind(&mut slots, &mut worklist, input, root, target)?;
        }

        while let Some(node) = worklist.pop() {
            let parent_slot = match slots[node.index()] {
                Some(slot) => self.find(slot),
                None => continue,
            };
            let children = graph.node(node).map(|n| n.children().to_vec()).unwrap_or_default();
            let sibling_frames = frames_of(graph, &children)?;
            for child in children {
                let frame = node_frame(graph, child)?;
                let matched = self.matching_child(parent_slot, frame, &sibling_frames)?;
                let target = match (matched, slots[child.index()]) {
                    (Some(existing), Some(_)) => existing,
                    // Already placed through another parent: share it
                    (None, Some(placed)) => {
                        let placed = self.find(placed);
                        self.add_edge(parent_slot, placed);
                        placed
                    }
                    (Some(existing), None) if !self.owned_by(existing, input) => existing,
                    (_, None) => self.push(frame.clone(), Some(parent_slot)),
                };
                self.bind(&mut slots, &mut worklist, input, child, target)?;
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    EnsembleError::InvalidGraph(format!(
                        "node n{} is not reachable from the roots",
                        index
                    ))
                })
            })
            .collect()
    }

    /// Compact the arena into a finished graph in traversal order
    ///
    /// Returns the graph and, for every slot, its node in that graph.
    pub fn finish(mut self) -> Result<(CallGraph, Vec<NodeId>), EnsembleError> {
        let len = self.slot_count();
        let reps: Vec<NodeId> = (0..len).map(|i| self.find(NodeId::from_index(i))).collect();

        let mut rep_children: Vec<Vec<NodeId>> = vec![Vec::new(); len];
        for slot in 0..len {
            if reps[slot].index() != slot {
                continue;
            }
            let mut kids: Vec<NodeId> = Vec::new();
            for child in &self.children[slot] {
                let rep = reps[child.index()];
                if rep.index() != slot && !kids.contains(&rep) {
                    kids.push(rep);
                }
            }
            rep_children[slot] = kids;
        }
        let mut roots: Vec<NodeId> = Vec::new();
        for root in &self.roots {
            let rep = reps[root.index()];
            if !roots.contains(&rep) {
                roots.push(rep);
            }
        }

        let order = traverse_arena(len, &roots, |id| rep_children[id.index()].as_slice());
        let mut position: Vec<Option<NodeId>> = vec![None; len];
        for (ordinal, slot) in order.iter().enumerate() {
            position[slot.index()] = Some(NodeId::from_index(ordinal));
        }

        let resolve: Vec<NodeId> = reps
            .iter()
            .enumerate()
            .map(|(slot, rep)| {
                position[rep.index()].ok_or_else(|| EnsembleError::CorruptedMapping {
                    old: format!("slot {}", slot),
                    new: "unreachable representative".to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        let frames: Vec<Frame> = order.iter().map(|slot| self.frames[slot.index()].clone()).collect();
        let children: Vec<Vec<NodeId>> = order
            .iter()
            .map(|slot| {
                rep_children[slot.index()]
                    .iter()
                    .map(|child| resolve[child.index()])
                    .collect()
            })
            .collect();
        let roots = roots.iter().map(|root| resolve[root.index()]).collect();

        debug!(
            "Compacted union arena: {} slots, {} nodes, {} merges",
            len,
            frames.len(),
            self.merges
        );

        Ok((CallGraph::from_traversal(frames, children, roots), resolve))
    }

    /// Record that `node` of `input` lives in `target`
    ///
    /// A node that already lives elsewhere merges the two slots when no
    /// input holds a node in both; otherwise it stays where it was placed.
    fn bind(
        &mut self,
        slots: &mut [Option<NodeId>],
        worklist: &mut Vec<NodeId>,
        input: usize,
        node: NodeId,
        target: NodeId,
    ) -> Result<(), EnsembleError> {
        match slots[node.index()] {
            None => {
                slots[node.index()] = Some(target);
                self.own(target, input);
                worklist.push(node);
            }
            Some(previous) => {
                if self.find(previous) != self.find(target) && !self.try_merge(previous, target)? {
                    debug!(
                        "Kept union slots {} and {} apart: one input holds a node in each",
                        previous, target
                    );
                }
            }
        }
        Ok(())
    }

    fn matching_root(&mut self, frame: &Frame, siblings: &[&Frame]) -> Result<Option<NodeId>, EnsembleError> {
        let roots = self.roots.clone();
        self.matching_among(&roots, frame, siblings)
    }

    fn matching_child(
        &mut self,
        parent: NodeId,
        frame: &Frame,
        siblings: &[&Frame],
    ) -> Result<Option<NodeId>, EnsembleError> {
        let children = self.children[parent.index()].clone();
        self.matching_among(&children, frame, siblings)
    }

    fn matching_among(
        &mut self,
        candidates: &[NodeId],
        frame: &Frame,
        siblings: &[&Frame],
    ) -> Result<Option<NodeId>, EnsembleError> {
        let mut conflict = None;
        for &candidate in candidates {
            let rep = self.find(candidate);
            let existing = &self.frames[rep.index()];
            if existing == frame {
                return Ok(Some(rep));
            }
            if conflict.is_none() && existing.same_position(frame) && !siblings.iter().any(|s| *s == existing) {
                conflict = Some(rep);
            }
        }
        match conflict {
            Some(rep) => Err(self.mismatch(rep, frame)),
            None => Ok(None),
        }
    }

    fn exact_child(&mut self, parent: NodeId, frame: &Frame) -> Option<NodeId> {
        let children = self.children[parent.index()].clone();
        for child in children {
            let rep = self.find(child);
            if &self.frames[rep.index()] == frame {
                return Some(rep);
            }
        }
        None
    }

    /// Merge two slots, rolling back when the merge would join two nodes of
    /// one input anywhere below them
    fn try_merge(&mut self, a: NodeId, b: NodeId) -> Result<bool, EnsembleError> {
        let (ra, rb) = (self.find(a), self.find(b));
        if self.shares_input(ra, rb) {
            return Ok(false);
        }
        let snapshot = self.clone();
        if self.merge(ra, rb)? {
            Ok(true)
        } else {
            *self = snapshot;
            Ok(false)
        }
    }

    /// Merge two slots and, recursively, their equivalent children
    fn merge(&mut self, a: NodeId, b: NodeId) -> Result<bool, EnsembleError> {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let (ra, rb) = (self.find(a), self.find(b));
            if ra == rb {
                continue;
            }
            if self.frames[ra.index()] != self.frames[rb.index()] {
                let frame = self.frames[rb.index()].clone();
                return Err(self.mismatch(ra, &frame));
            }
            if self.shares_input(ra, rb) {
                return Ok(false);
            }
            // The older slot keeps its identity
            let (keep, gone) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.forest[gone.index()] = keep;
            let moved_owners = std::mem::take(&mut self.owners[gone.index()]);
            self.owners[keep.index()].extend(moved_owners);
            self.merges += 1;
            debug!("Merged union slot {} into {}", gone, keep);

            let moved = std::mem::take(&mut self.children[gone.index()]);
            for child in moved {
                let child_rep = self.find(child);
                let frame = self.frames[child_rep.index()].clone();
                match self.exact_child(keep, &frame) {
                    Some(existing) if existing != child_rep => pending.push((existing, child_rep)),
                    Some(_) => {}
                    None => self.add_edge(keep, child_rep),
                }
            }
        }
        Ok(true)
    }

    fn own(&mut self, slot: NodeId, input: usize) {
        let rep = self.find(slot);
        if !self.owners[rep.index()].contains(&input) {
            self.owners[rep.index()].push(input);
        }
    }

    fn owned_by(&mut self, slot: NodeId, input: usize) -> bool {
        let rep = self.find(slot);
        self.owners[rep.index()].contains(&input)
    }

    fn shares_input(&self, a: NodeId, b: NodeId) -> bool {
        self.owners[a.index()]
            .iter()
            .any(|input| self.owners[b.index()].contains(input))
    }

    fn push(&mut self, frame: Frame, parent: Option<NodeId>) -> NodeId {
        let slot = NodeId::from_index(self.frames.len());
        self.frames.push(frame);
        self.children.push(Vec::new());
        self.first_parent.push(parent);
        self.forest.push(slot);
        self.owners.push(Vec::new());
        match parent {
            Some(parent) => self.children[parent.index()].push(slot),
            None => self.roots.push(slot),
        }
        slot
    }

    fn add_edge(&mut self, parent: NodeId, child: NodeId) {
        if !self.children[parent.index()].contains(&child) {
            self.children[parent.index()].push(child);
        }
    }

    fn mismatch(&mut self, slot: NodeId, frame: &Frame) -> EnsembleError {
        EnsembleError::StructuralMismatch {
            position: self.position(slot),
            left: self.frames[slot.index()].to_string(),
            right: frame.to_string(),
        }
    }

    fn position(&mut self, slot: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(slot);
        while let Some(id) = current {
            names.push(self.frames[id.index()].name().to_string());
            if names.len() > self.frames.len() {
                break;
            }
            current = match self.first_parent[id.index()] {
                Some(parent) => Some(self.find(parent)),
                None => None,
            };
        }
        names.reverse();
        names.join("/")
    }
}

fn frames_of<'g>(graph: &'g CallGraph, ids: &[NodeId]) -> Result<Vec<&'g Frame>, EnsembleError> {
    ids.iter().map(|&id| node_frame(graph, id)).collect()
}

fn node_frame(graph: &CallGraph, id: NodeId) -> Result<&Frame, EnsembleError> {
    graph
        .frame(id)
        .ok_or_else(|| EnsembleError::InvalidGraph(format!("unknown node {}", id)))
}
