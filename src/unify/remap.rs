//! Flatten unification results into one node map per dataset.

use super::unifier::Unification;
use crate::graph::{CallGraph, NodeId, NodeMap};
use crate::utils::error::EnsembleError;

/// Turns the fold's slot records into `NodeMap`s
pub struct NodeRemapPropagator<'a> {
    unification: &'a Unification,
}

impl<'a> NodeRemapPropagator<'a> {
    pub fn new(unification: &'a Unification) -> Self {
        Self { unification }
    }

    /// Map every node of `original` (input `input`) to its unified node
    ///
    /// Each pair is re-checked: the unified node must carry the same frame
    /// as the original.
    ///
    /// # Errors
    /// * `EnsembleError::CorruptedMapping` - a node has no slot, a slot no
    ///   unified node, the frames disagree, or two nodes share a unified node
    pub fn flatten(&self, input: usize, original: &CallGraph) -> Result<NodeMap, EnsembleError> {
        let unified = self.unification.graph();
        let slots = self
            .unification
            .slots_of(input)
            .ok_or_else(|| EnsembleError::CorruptedMapping {
                old: format!("input {}", input),
                new: "no recorded slots".to_string(),
            })?;
        if slots.len() != original.len() {
            return Err(EnsembleError::CorruptedMapping {
                old: format!("input {} with {} nodes", input, original.len()),
                new: format!("{} recorded slots", slots.len()),
            });
        }

        let mut targets: Vec<NodeId> = Vec::with_capacity(slots.len());
        let mut claimed: Vec<Option<NodeId>> = vec![None; unified.len()];
        for (old, slot) in original.node_ids().zip(slots.iter()) {
            let new = self
                .unification
                .resolve(*slot)
                .ok_or_else(|| EnsembleError::CorruptedMapping {
                    old: old.to_string(),
                    new: format!("unresolved slot {}", slot),
                })?;
            let (old_frame, new_frame) = (original.frame(old), unified.frame(new));
            if old_frame.is_none() || old_frame != new_frame {
                return Err(EnsembleError::CorruptedMapping {
                    old: format!("{} {}", old, describe(old_frame)),
                    new: format!("{} {}", new, describe(new_frame)),
                });
            }
            match claimed.get_mut(new.index()) {
                Some(Some(other)) => {
                    return Err(EnsembleError::CorruptedMapping {
                        old: format!("{} and {}", other, old),
                        new: format!("{} for both", new),
                    })
                }
                Some(entry) => *entry = Some(old),
                None => {
                    return Err(EnsembleError::CorruptedMapping {
                        old: old.to_string(),
                        new: format!("{} outside the unified graph", new),
                    })
                }
            }
            targets.push(new);
        }
        Ok(NodeMap::from_targets(targets))
    }

    /// Flatten every input in order
    pub fn propagate_all(&self, originals: &[&CallGraph]) -> Result<Vec<NodeMap>, EnsembleError> {
        originals
            .iter()
            .enumerate()
            .map(|(input, graph)| self.flatten(input, graph))
            .collect()
    }
}

fn describe(frame: Option<&crate::graph::Frame>) -> String {
    frame.map(|f| f.to_string()).unwrap_or_else(|| "<missing>".to_string())
}
