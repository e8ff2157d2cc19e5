//! Consistency checks run after every composition.

use super::model::Ensemble;
use crate::graph::CallGraph;
use crate::table::{ColumnLabel, IndexValue, ProfileId, Table, Value};
use crate::utils::config::{NODE_LEVEL, PROFILE_LEVEL};
use crate::utils::error::EnsembleError;
use log::debug;
use std::collections::BTreeSet;

/// Check the ensemble invariants in order, stopping at the first violation
///
/// # Checks
/// 1. Every node in the combined and statistics tables is reachable
/// 2. Graph ordinals are `0..K-1` in traversal order
/// 3. No two combined-table rows share a full index key
/// 4. Display names match the frame name of the row's node, or are absent
/// 5. Profile list, mapping keys, metadata ids and table profiles are set-equal,
///    and every metadata row matches the metadata columns
///
/// Nothing is repaired.
pub fn validate<K: ColumnLabel>(ensemble: &Ensemble<K>) -> Result<(), EnsembleError> {
    let graph = ensemble.graph();
    let reachable: BTreeSet<IndexValue> = graph.traverse().into_iter().map(IndexValue::Node).collect();

    check_references(ensemble.table(), &reachable)?;
    check_references(ensemble.statistics(), &reachable)?;

    graph.check_ordinals()?;

    for table in [ensemble.table(), ensemble.statistics()] {
        if let Some(key) = table.duplicate_key() {
            return Err(EnsembleError::DuplicateIndex(format_key(key)));
        }
    }

    check_names(ensemble.table(), graph, ensemble.name_column())?;
    check_names(ensemble.statistics(), graph, ensemble.name_column())?;

    check_profiles(ensemble)?;

    debug!("Ensemble is consistent: {}", ensemble.summary());
    Ok(())
}

fn check_references<K: ColumnLabel>(table: &Table<K>, reachable: &BTreeSet<IndexValue>) -> Result<(), EnsembleError> {
    table.check_shape()?;
    let level = table.level(NODE_LEVEL)?;
    match table.rows().iter().find(|r| !reachable.contains(&r.index[level])) {
        Some(row) => Err(EnsembleError::DanglingNode(row.index[level].to_string())),
        None => Ok(()),
    }
}

fn check_names<K: ColumnLabel>(table: &Table<K>, graph: &CallGraph, name_column: &str) -> Result<(), EnsembleError> {
    let Some(column) = table.name_position(name_column) else {
        return Ok(());
    };
    let level = table.level(NODE_LEVEL)?;
    for row in table.rows() {
        let found = match &row.values[column] {
            Value::Text(name) => name,
            _ => continue,
        };
        let Some(id) = row.index[level].as_node() else {
            continue;
        };
        let expected = graph.frame(id).map(|f| f.name()).unwrap_or_default();
        if found != expected {
            return Err(EnsembleError::NameConsistency {
                node: id.to_string(),
                found: found.clone(),
                expected: expected.to_string(),
            });
        }
    }
    Ok(())
}

fn check_profiles<K: ColumnLabel>(ensemble: &Ensemble<K>) -> Result<(), EnsembleError> {
    let listed: BTreeSet<&ProfileId> = ensemble.profiles().iter().collect();
    if listed.len() != ensemble.profiles().len() {
        return Err(EnsembleError::ProfileConsistency("profile list repeats an id".to_string()));
    }

    let mapped: BTreeSet<&ProfileId> = ensemble.profile_mapping().keys().collect();
    if mapped != listed {
        return Err(EnsembleError::ProfileConsistency(format!(
            "mapping keys {} differ from profile list {}",
            format_set(&mapped),
            format_set(&listed)
        )));
    }

    let metadata = ensemble.metadata();
    metadata.check_shape()?;
    let metadata_level = metadata.level(PROFILE_LEVEL)?;
    let described = metadata.level_values(metadata_level);
    if described.len() != metadata.len() {
        return Err(EnsembleError::ProfileConsistency(
            "metadata has several records for one profile".to_string(),
        ));
    }
    let described: BTreeSet<&ProfileId> = described.iter().collect();
    if described != listed {
        return Err(EnsembleError::ProfileConsistency(format!(
            "metadata profiles {} differ from profile list {}",
            format_set(&described),
            format_set(&listed)
        )));
    }

    let table = ensemble.table();
    let table_level = table.level(PROFILE_LEVEL)?;
    let measured = table.level_values(table_level);
    let measured: BTreeSet<&ProfileId> = measured.iter().collect();
    if measured != listed {
        return Err(EnsembleError::ProfileConsistency(format!(
            "table profiles {} differ from profile list {}",
            format_set(&measured),
            format_set(&listed)
        )));
    }
    Ok(())
}

fn format_key(key: &[IndexValue]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("({})", parts.join(", "))
}

fn format_set(set: &BTreeSet<&ProfileId>) -> String {
    let parts: Vec<String> = set.iter().map(|v| v.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}
