//! Arena-backed call graphs.
//!
//! A graph is a growable array of nodes; a node's identity is its index in
//! that array. Traversal is pre-order from the roots, children in insertion
//! order, every node visited once even when it has several parents.

use super::frame::Frame;
use crate::utils::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense identifier of a node inside one graph
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One call-stack position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPathNode {
    frame: Frame,
    children: Vec<NodeId>,
    parents: Vec<NodeId>,
    ordinal: Option<usize>,
}

impl CallPathNode {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            children: Vec::new(),
            parents: Vec::new(),
            ordinal: None,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn name(&self) -> &str {
        self.frame.name()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Position in traversal order; `None` until the graph is finished
    pub fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }
}

/// Rooted tree or DAG of call-path nodes with finalized ordinals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCallGraph")]
pub struct CallGraph {
    nodes: Vec<CallPathNode>,
    roots: Vec<NodeId>,
}

#[derive(Deserialize)]
struct RawCallGraph {
    nodes: Vec<CallPathNode>,
    roots: Vec<NodeId>,
}

impl TryFrom<RawCallGraph> for CallGraph {
    type Error = EnsembleError;

    fn try_from(raw: RawCallGraph) -> Result<Self, Self::Error> {
        let graph = CallGraph {
            nodes: raw.nodes,
            roots: raw.roots,
        };
        graph.check_structure()?;
        Ok(graph)
    }
}

impl CallGraph {
    pub fn builder() -> CallGraphBuilder {
        CallGraphBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&CallPathNode> {
        self.nodes.get(id.index())
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.node(id).map(CallPathNode::frame)
    }

    pub fn ordinal(&self, id: NodeId) -> Option<usize> {
        self.node(id).and_then(CallPathNode::ordinal)
    }

    /// All node ids in arena order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Pre-order traversal from the roots
    pub fn traverse(&self) -> Vec<NodeId> {
        traverse_arena(self.nodes.len(), &self.roots, |id| self.nodes[id.index()].children.as_slice())
    }

    /// Follow a chain of names from a root
    ///
    /// Useful for locating a node without knowing its id.
    pub fn find_path(&self, names: &[&str]) -> Option<NodeId> {
        let (first, rest) = names.split_first()?;
        let mut current = *self.roots.iter().find(|r| self.nodes[r.index()].name() == *first)?;
        for name in rest {
            current = *self.nodes[current.index()]
                .children
                .iter()
                .find(|c| self.nodes[c.index()].name() == *name)?;
        }
        Some(current)
    }

    /// Human-readable path of a node through its first parents
    pub fn path_string(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            names.push(node.name().to_string());
            // Guard against malformed cyclic parent links
            if names.len() > self.nodes.len() {
                break;
            }
            current = node.parents.first().copied();
        }
        names.reverse();
        names.join("/")
    }

    /// Verify that ordinals are exactly 0..K-1 in traversal order
    pub fn check_ordinals(&self) -> Result<(), EnsembleError> {
        let order = self.traverse();
        if order.len() != self.nodes.len() {
            return Err(EnsembleError::MissingOrdinal(format!(
                "{} of {} nodes are reachable from the roots",
                order.len(),
                self.nodes.len()
            )));
        }
        for (position, id) in order.iter().enumerate() {
            match self.nodes[id.index()].ordinal {
                Some(ordinal) if ordinal == position => {}
                Some(ordinal) => {
                    return Err(EnsembleError::MissingOrdinal(format!(
                        "node {} ({}) has ordinal {} at traversal position {}",
                        id,
                        self.path_string(*id),
                        ordinal,
                        position
                    )))
                }
                None => {
                    return Err(EnsembleError::MissingOrdinal(format!(
                        "node {} ({}) has no ordinal",
                        id,
                        self.path_string(*id)
                    )))
                }
            }
        }
        Ok(())
    }

    /// Check edge targets and parent/child symmetry
    fn check_structure(&self) -> Result<(), EnsembleError> {
        let len = self.nodes.len();
        let in_range = |id: &NodeId| id.index() < len;
        if let Some(bad) = self.roots.iter().find(|r| !in_range(*r)) {
            return Err(EnsembleError::InvalidGraph(format!("root {} out of range", bad)));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId::from_index(index);
            for child in &node.children {
                if !in_range(child) || !self.nodes[child.index()].parents.contains(&id) {
                    return Err(EnsembleError::InvalidGraph(format!(
                        "edge {} -> {} has no matching parent link",
                        id, child
                    )));
                }
            }
            for parent in &node.parents {
                if !in_range(parent) || !self.nodes[parent.index()].children.contains(&id) {
                    return Err(EnsembleError::InvalidGraph(format!(
                        "parent link {} -> {} has no matching edge",
                        parent, id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build a graph whose arena order is its traversal order
    ///
    /// `frames[i]` and `children[i]` describe node `i`; ordinals equal ids.
    pub(crate) fn from_traversal(frames: Vec<Frame>, children: Vec<Vec<NodeId>>, roots: Vec<NodeId>) -> Self {
        let mut nodes: Vec<CallPathNode> = frames.into_iter().map(CallPathNode::new).collect();
        for (index, kids) in children.into_iter().enumerate() {
            let parent = NodeId::from_index(index);
            for child in &kids {
                nodes[child.index()].parents.push(parent);
            }
            nodes[index].children = kids;
        }
        let mut graph = CallGraph { nodes, roots };
        graph.assign_ordinals();
        graph
    }

    fn assign_ordinals(&mut self) {
        for (ordinal, id) in self.traverse().into_iter().enumerate() {
            self.nodes[id.index()].ordinal = Some(ordinal);
        }
    }
}

/// Iterative pre-order walk shared by finished graphs and the union arena
pub(crate) fn traverse_arena<'a, F>(len: usize, roots: &[NodeId], children: F) -> Vec<NodeId>
where
    F: Fn(NodeId) -> &'a [NodeId],
{
    let mut seen = vec![false; len];
    let mut order = Vec::with_capacity(len);
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if seen[id.index()] {
            continue;
        }
        seen[id.index()] = true;
        order.push(id);
        stack.extend(children(id).iter().rev().copied());
    }
    order
}

/// Incremental constructor for [`CallGraph`]
#[derive(Debug, Default)]
pub struct CallGraphBuilder {
    nodes: Vec<CallPathNode>,
    roots: Vec<NodeId>,
}

impl CallGraphBuilder {
    pub fn add_root(&mut self, frame: Frame) -> NodeId {
        let id = self.push(frame);
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, frame: Frame) -> Result<NodeId, EnsembleError> {
        self.check(parent)?;
        let id = self.push(frame);
        self.nodes[parent.index()].children.push(id);
        self.nodes[id.index()].parents.push(parent);
        Ok(id)
    }

    /// Add an extra parent edge, turning the tree into a DAG
    pub fn link(&mut self, parent: NodeId, child: NodeId) -> Result<(), EnsembleError> {
        self.check(parent)?;
        self.check(child)?;
        if parent == child {
            return Err(EnsembleError::InvalidGraph(format!("self edge on {}", parent)));
        }
        if !self.nodes[parent.index()].children.contains(&child) {
            self.nodes[parent.index()].children.push(child);
            self.nodes[child.index()].parents.push(parent);
        }
        Ok(())
    }

    /// Walk `frames` from the roots, creating whatever is missing
    ///
    /// Returns the id of the last frame's node.
    pub fn add_path(&mut self, frames: &[Frame]) -> Result<NodeId, EnsembleError> {
        let (first, rest) = frames
            .split_first()
            .ok_or_else(|| EnsembleError::InvalidGraph("empty path".to_string()))?;
        let mut current = match self.roots.iter().find(|r| self.nodes[r.index()].frame == *first) {
            Some(root) => *root,
            None => self.add_root(first.clone()),
        };
        for frame in rest {
            let existing = self.nodes[current.index()]
                .children
                .iter()
                .find(|c| self.nodes[c.index()].frame == *frame)
                .copied();
            current = match existing {
                Some(child) => child,
                None => self.add_child(current, frame.clone())?,
            };
        }
        Ok(current)
    }

    pub fn finish(self) -> CallGraph {
        let mut graph = CallGraph {
            nodes: self.nodes,
            roots: self.roots,
        };
        graph.assign_ordinals();
        graph
    }

    fn push(&mut self, frame: Frame) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(CallPathNode::new(frame));
        id
    }

    fn check(&self, id: NodeId) -> Result<(), EnsembleError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(EnsembleError::InvalidGraph(format!("unknown node {}", id)))
        }
    }
}

/// Old → new node identities for one source graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMap {
    targets: Vec<NodeId>,
}

impl NodeMap {
    pub fn identity(len: usize) -> Self {
        Self {
            targets: (0..len).map(NodeId::from_index).collect(),
        }
    }

    pub(crate) fn from_targets(targets: Vec<NodeId>) -> Self {
        Self { targets }
    }

    pub fn get(&self, old: NodeId) -> Option<NodeId> {
        self.targets.get(old.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .map(|(old, new)| (NodeId::from_index(old), *new))
    }
}
