//! Input datasets: one graph with the tables that point into it.

use super::model::{mapping_pairs, ProfileMapping};
use crate::graph::{CallGraph, NodeMap};
use crate::table::{Column, ColumnKind, IndexValue, ProfileId, SingleIndexedTable, Table, TableRealigner, Value};
use crate::utils::config::{NODE_LEVEL, PROFILE_LEVEL};
use crate::utils::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What a profile reader hands over for one profile
#[derive(Debug, Clone)]
pub struct ReaderOutput {
    /// Call graph of the profile
    pub graph: Arc<CallGraph>,

    /// Measurements indexed by (node, profile[, extra levels])
    pub table: SingleIndexedTable,

    /// Scalar attributes of the run (one record)
    pub metadata: BTreeMap<String, Value>,

    /// Metrics measured per node excluding children
    pub exclusive_metrics: Vec<String>,

    /// Metrics measured per node including children
    pub inclusive_metrics: Vec<String>,

    /// Identifier of the profile
    pub profile: ProfileId,

    /// Where the profile came from (usually a file path)
    pub source: String,
}

/// A call graph plus the measurement and metadata tables that refer to it
///
/// The graph and the measurement table only change together, through
/// [`ProfileDataset::rebind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDataset {
    graph: Arc<CallGraph>,
    table: SingleIndexedTable,
    metadata: SingleIndexedTable,
    profiles: Vec<ProfileId>,
    #[serde(with = "mapping_pairs")]
    profile_mapping: ProfileMapping,
    exclusive_metrics: Vec<String>,
    inclusive_metrics: Vec<String>,
}

impl ProfileDataset {
    /// Build a single-profile dataset from reader output
    ///
    /// # Errors
    /// * `EnsembleError::MissingIndexLevel` - the table lacks `node` or `profile`
    /// * `EnsembleError::DanglingNode` - a row names a node outside the graph
    /// * `EnsembleError::ProfileConsistency` - a row belongs to another profile
    pub fn from_reader(output: ReaderOutput) -> Result<Self, EnsembleError> {
        if matches!(output.profile, IndexValue::Node(_)) {
            return Err(EnsembleError::ProfileConsistency(format!(
                "profile id {} is a node",
                output.profile
            )));
        }

        let columns = output
            .metadata
            .iter()
            .map(|(field, value)| Column::new(field.clone(), ColumnKind::of(value)))
            .collect();
        let mut metadata = Table::new(vec![PROFILE_LEVEL.to_string()], columns)?;
        metadata.push_row(vec![output.profile.clone()], output.metadata.into_values().collect())?;

        let mut profile_mapping = BTreeMap::new();
        profile_mapping.insert(output.profile.clone(), vec![output.source]);

        let dataset = Self {
            graph: output.graph,
            table: output.table,
            metadata,
            profiles: vec![output.profile],
            profile_mapping,
            exclusive_metrics: output.exclusive_metrics,
            inclusive_metrics: output.inclusive_metrics,
        };
        dataset.check()?;
        Ok(dataset)
    }

    pub(crate) fn from_parts(
        graph: Arc<CallGraph>,
        table: SingleIndexedTable,
        metadata: SingleIndexedTable,
        profiles: Vec<ProfileId>,
        profile_mapping: ProfileMapping,
        exclusive_metrics: Vec<String>,
        inclusive_metrics: Vec<String>,
    ) -> Self {
        Self {
            graph,
            table,
            metadata,
            profiles,
            profile_mapping,
            exclusive_metrics,
            inclusive_metrics,
        }
    }

    pub fn graph(&self) -> &Arc<CallGraph> {
        &self.graph
    }

    pub fn table(&self) -> &SingleIndexedTable {
        &self.table
    }

    pub fn metadata(&self) -> &SingleIndexedTable {
        &self.metadata
    }

    pub fn profiles(&self) -> &[ProfileId] {
        &self.profiles
    }

    pub fn profile_mapping(&self) -> &ProfileMapping {
        &self.profile_mapping
    }

    pub fn exclusive_metrics(&self) -> &[String] {
        &self.exclusive_metrics
    }

    pub fn inclusive_metrics(&self) -> &[String] {
        &self.inclusive_metrics
    }

    /// Metadata record of one profile as (field, value) pairs
    pub fn metadata_record(&self, profile: &ProfileId) -> Option<Vec<(&str, &Value)>> {
        let row = self.metadata.find_row(std::slice::from_ref(profile))?;
        Some(
            self.metadata
                .columns()
                .iter()
                .map(|c| c.label.as_str())
                .zip(row.values.iter())
                .collect(),
        )
    }

    /// Point the dataset at `graph`, rewriting the table through `map`
    ///
    /// Nothing changes if the rewrite fails.
    pub fn rebind(&mut self, graph: Arc<CallGraph>, map: &NodeMap) -> Result<(), EnsembleError> {
        let table = TableRealigner::realign(&self.table, map, NODE_LEVEL)?;
        self.commit(graph, table);
        Ok(())
    }

    /// Swap in an already realigned table together with its graph
    pub(crate) fn commit(&mut self, graph: Arc<CallGraph>, table: SingleIndexedTable) {
        self.graph = graph;
        self.table = table;
    }

    /// Verify that graph, tables and profile lists agree
    pub fn check(&self) -> Result<(), EnsembleError> {
        self.graph.check_ordinals()?;
        self.table.check_shape()?;
        self.metadata.check_shape()?;

        let node_level = self.table.level(NODE_LEVEL)?;
        let profile_level = self.table.level(PROFILE_LEVEL)?;
        for row in self.table.rows() {
            match row.index[node_level].as_node() {
                Some(id) if self.graph.contains(id) => {}
                _ => return Err(EnsembleError::DanglingNode(row.index[node_level].to_string())),
            }
        }

        let profiles: BTreeSet<&ProfileId> = self.profiles.iter().collect();
        if profiles.len() != self.profiles.len() {
            return Err(EnsembleError::ProfileConsistency("profile list repeats an id".to_string()));
        }
        if let Some(stray) = self
            .table
            .rows()
            .iter()
            .map(|r| &r.index[profile_level])
            .find(|p| !profiles.contains(p))
        {
            return Err(EnsembleError::ProfileConsistency(format!(
                "table row for unknown profile {}",
                stray
            )));
        }

        let metadata_level = self.metadata.level(PROFILE_LEVEL)?;
        let in_metadata = self.metadata.level_values(metadata_level);
        let mapped: BTreeSet<&ProfileId> = self.profile_mapping.keys().collect();
        if in_metadata.len() != self.metadata.len()
            || in_metadata.iter().collect::<BTreeSet<_>>() != profiles
            || mapped != profiles
        {
            return Err(EnsembleError::ProfileConsistency(
                "metadata, mapping and profile list disagree".to_string(),
            ));
        }
        Ok(())
    }
}
