//! The composed ensemble and helpers shared by both strategies.

use super::dataset::ProfileDataset;
use super::validate;
use crate::graph::CallGraph;
use crate::table::{Column, ColumnKind, ColumnLabel, IndexValue, JoinedColumn, ProfileId, Table, Value};
use crate::utils::config::{NODE_LEVEL, PROFILE_LEVEL};
use crate::utils::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Profile id → source descriptors
pub type ProfileMapping = BTreeMap<ProfileId, Vec<String>>;

/// Ensemble built by stacking profiles as rows
pub type StackedEnsemble = Ensemble<String>;

/// Ensemble built by joining profiles as column groups
pub type JoinedEnsemble = Ensemble<JoinedColumn>;

/// Several profiles sharing one unified call graph
///
/// The graph is held once and shared by the combined and statistics
/// tables. Tables can be edited through the `_mut` accessors; call
/// [`Ensemble::validate`] afterwards to re-check the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble<K> {
    pub(crate) graph: Arc<CallGraph>,
    pub(crate) table: Table<K>,
    pub(crate) statistics: Table<K>,
    pub(crate) metadata: Table<K>,
    pub(crate) profiles: Vec<ProfileId>,
    #[serde(with = "mapping_pairs")]
    pub(crate) profile_mapping: ProfileMapping,
    pub(crate) exclusive_metrics: Vec<K>,
    pub(crate) inclusive_metrics: Vec<K>,
    pub(crate) name_column: String,
}

impl<K: ColumnLabel> Ensemble<K> {
    pub fn graph(&self) -> &Arc<CallGraph> {
        &self.graph
    }

    pub fn table(&self) -> &Table<K> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table<K> {
        &mut self.table
    }

    pub fn statistics(&self) -> &Table<K> {
        &self.statistics
    }

    pub fn statistics_mut(&mut self) -> &mut Table<K> {
        &mut self.statistics
    }

    pub fn metadata(&self) -> &Table<K> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Table<K> {
        &mut self.metadata
    }

    pub fn profiles(&self) -> &[ProfileId] {
        &self.profiles
    }

    pub fn profile_mapping(&self) -> &ProfileMapping {
        &self.profile_mapping
    }

    pub fn exclusive_metrics(&self) -> &[K] {
        &self.exclusive_metrics
    }

    pub fn inclusive_metrics(&self) -> &[K] {
        &self.inclusive_metrics
    }

    pub fn name_column(&self) -> &str {
        &self.name_column
    }

    /// Check all ensemble invariants
    pub fn validate(&self) -> Result<(), EnsembleError> {
        validate::validate(self)
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "Nodes: {} | Profiles: {} | Rows: {} | Columns: {}",
            self.graph.len(),
            self.profiles.len(),
            self.table.len(),
            self.table.columns().len()
        )
    }
}

impl Ensemble<String> {
    /// Copy one metadata field into the combined table, per profile
    ///
    /// # Errors
    /// * `EnsembleError::NotAProfileColumn` - no metadata field `field`
    /// * `EnsembleError::RowShape` - the table already has such a column
    pub fn add_column_from_metadata(&mut self, field: &str) -> Result<(), EnsembleError> {
        let label = field.to_string();
        let source = self
            .metadata
            .column_position(&label)
            .ok_or_else(|| EnsembleError::NotAProfileColumn(field.to_string()))?;
        let kind = self.metadata.columns()[source].kind;
        let metadata_level = self.metadata.level(PROFILE_LEVEL)?;
        let by_profile: BTreeMap<IndexValue, Value> = self
            .metadata
            .rows()
            .iter()
            .filter_map(|r| Some((r.index.get(metadata_level)?.clone(), r.values.get(source)?.clone())))
            .collect();

        let profile_level = self.table.level(PROFILE_LEVEL)?;
        self.table.add_column_with(Column::new(label, kind), |row| {
            by_profile
                .get(&row.index[profile_level])
                .cloned()
                .unwrap_or_else(|| kind.missing())
        })
    }

    /// Keep the profiles whose metadata satisfies `keep`
    ///
    /// The graph is unchanged; table, metadata, profile list and mapping
    /// are filtered together and the result is validated.
    pub fn filter_profiles<F>(&self, mut keep: F) -> Result<StackedEnsemble, EnsembleError>
    where
        F: FnMut(&[(&str, &Value)]) -> bool,
    {
        let metadata_level = self.metadata.level(PROFILE_LEVEL)?;
        let kept: BTreeSet<ProfileId> = self
            .metadata
            .rows()
            .iter()
            .filter(|row| {
                let record: Vec<(&str, &Value)> = self
                    .metadata
                    .columns()
                    .iter()
                    .map(|c| c.label.as_str())
                    .zip(row.values.iter())
                    .collect();
                keep(&record)
            })
            .map(|row| row.index[metadata_level].clone())
            .collect();

        let mut filtered = self.clone();
        let profile_level = filtered.table.level(PROFILE_LEVEL)?;
        filtered.table.retain_rows(|r| kept.contains(&r.index[profile_level]));
        filtered.metadata.retain_rows(|r| kept.contains(&r.index[metadata_level]));
        filtered.profiles.retain(|p| kept.contains(p));
        filtered.profile_mapping.retain(|p, _| kept.contains(p));
        filtered.validate()?;
        Ok(filtered)
    }
}

impl From<StackedEnsemble> for ProfileDataset {
    fn from(ensemble: StackedEnsemble) -> Self {
        ProfileDataset::from_parts(
            ensemble.graph,
            ensemble.table,
            ensemble.metadata,
            ensemble.profiles,
            ensemble.profile_mapping,
            ensemble.exclusive_metrics,
            ensemble.inclusive_metrics,
        )
    }
}

/// Sort rows by node ordinal, then by the remaining index levels
pub(crate) fn sort_by_node<K: ColumnLabel>(table: &mut Table<K>, graph: &CallGraph) -> Result<(), EnsembleError> {
    let node_level = table.level(NODE_LEVEL)?;
    let ordinal = |value: &IndexValue| {
        value
            .as_node()
            .and_then(|id| graph.ordinal(id))
            .unwrap_or(usize::MAX)
    };
    table.sort_rows_by(|a, b| {
        ordinal(&a.index[node_level])
            .cmp(&ordinal(&b.index[node_level]))
            .then_with(|| {
                let rest_a = a.index.iter().enumerate().filter(|(i, _)| *i != node_level);
                let rest_b = b.index.iter().enumerate().filter(|(i, _)| *i != node_level);
                rest_a.map(|(_, v)| v).cmp(rest_b.map(|(_, v)| v))
            })
    });
    Ok(())
}

/// Fresh statistics table: one row per node, carrying only its name
pub(crate) fn statistics_for<K: ColumnLabel>(graph: &CallGraph, name_label: K) -> Result<Table<K>, EnsembleError> {
    let mut statistics = Table::new(
        vec![NODE_LEVEL.to_string()],
        vec![Column::new(name_label, ColumnKind::Text)],
    )?;
    for id in graph.traverse() {
        let name = graph.node(id).map(|n| n.name().to_string()).unwrap_or_default();
        statistics.push_row(vec![IndexValue::Node(id)], vec![Value::Text(name)])?;
    }
    Ok(statistics)
}

/// Append labels not seen yet, keeping first-appearance order
pub(crate) fn union_labels<K: ColumnLabel>(into: &mut Vec<K>, labels: impl IntoIterator<Item = K>) {
    for label in labels {
        if !into.contains(&label) {
            into.push(label);
        }
    }
}

/// Serialize a profile mapping as a list of pairs
///
/// JSON object keys must be strings; profile ids are not.
pub(crate) mod mapping_pairs {
    use super::ProfileMapping;
    use crate::table::ProfileId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(mapping: &ProfileMapping, serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&ProfileId, &Vec<String>)> = mapping.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProfileMapping, D::Error> {
        let pairs: Vec<(ProfileId, Vec<String>)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
