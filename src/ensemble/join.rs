//! Column-union composition: each dataset becomes a labeled column block.

use super::dataset::ProfileDataset;
use super::model::{sort_by_node, statistics_for, union_labels, Ensemble, JoinedEnsemble, ProfileMapping};
use super::report_step;
use crate::graph::CallGraph;
use crate::table::{
    Column, ColumnJoinedTable, ColumnKind, IndexValue, JoinedColumn, ProfileId, SingleIndexedTable, Table,
    TableRealigner, Value,
};
use crate::unify::{GraphUnifier, NodeRemapPropagator};
use crate::utils::config::{ComposeOptions, NODE_LEVEL, PROFILE_LEVEL, SOURCE_PROFILE_COLUMN};
use crate::utils::error::EnsembleError;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

const STEPS: usize = 6;

/// Join `datasets` side by side under `headers`
///
/// With `key == None` profiles are paired by position; otherwise by the
/// value of metadata field `key`. Returns the ensemble plus each dataset's
/// table realigned to the unified graph (with original profile ids).
pub(crate) fn join_datasets(
    datasets: &[ProfileDataset],
    headers: &[&str],
    key: Option<&str>,
    options: &ComposeOptions,
) -> Result<(JoinedEnsemble, Vec<SingleIndexedTable>), EnsembleError> {
    check_preconditions(datasets, headers)?;

    // Step 1: unify graphs
    report_step(options, 1, STEPS, &format!("Unifying {} call graphs", datasets.len()));
    let graphs: Vec<Arc<CallGraph>> = datasets.iter().map(|d| Arc::clone(d.graph())).collect();
    let unification = GraphUnifier::new().with_progress(options.progress).unify(&graphs)?;
    let graph = Arc::clone(unification.graph());

    // Step 2: work out the join key of every profile
    report_step(options, 2, STEPS, "Resolving join keys");
    let keys = match key {
        None => positional_keys(datasets, headers)?,
        Some(field) => metadata_keys(datasets, headers, field)?,
    };

    // Step 3: realign node level, then re-key the profile level
    report_step(options, 3, STEPS, "Realigning measurement tables");
    let propagator = NodeRemapPropagator::new(&unification);
    let realigned = datasets
        .iter()
        .enumerate()
        .map(|(index, dataset)| {
            let map = propagator.flatten(index, dataset.graph())?;
            TableRealigner::realign(dataset.table(), &map, NODE_LEVEL)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let rekeyed = realigned
        .iter()
        .zip(&keys)
        .map(|(table, keys)| rekey(table, keys))
        .collect::<Result<Vec<_>, _>>()?;

    // Step 4: side-by-side blocks with one shared name column
    report_step(options, 4, STEPS, "Joining column blocks");
    let mut table = join_tables(&rekeyed, headers, &options.name_column)?;
    sort_by_node(&mut table, &graph)?;

    // Step 5: metadata, profiles, mapping, metrics
    report_step(options, 5, STEPS, "Joining metadata");
    let metadata = join_metadata(datasets, headers, &keys)?;
    let mut profiles: Vec<ProfileId> = Vec::new();
    let mut profile_mapping = ProfileMapping::new();
    let mut exclusive_metrics = Vec::new();
    let mut inclusive_metrics = Vec::new();
    for ((dataset, header), keys) in datasets.iter().zip(headers).zip(&keys) {
        for profile in dataset.profiles() {
            let joined = &keys[profile];
            if !profiles.contains(joined) {
                profiles.push(joined.clone());
            }
            let sources = dataset.profile_mapping().get(profile).into_iter().flatten();
            profile_mapping
                .entry(joined.clone())
                .or_default()
                .extend(sources.map(|s| format!("{}:{}", header, s)));
        }
        union_labels(
            &mut exclusive_metrics,
            dataset.exclusive_metrics().iter().map(|m| JoinedColumn::under(*header, m.as_str())),
        );
        union_labels(
            &mut inclusive_metrics,
            dataset.inclusive_metrics().iter().map(|m| JoinedColumn::under(*header, m.as_str())),
        );
    }

    let statistics = statistics_for(&graph, JoinedColumn::top(options.name_column.as_str()))?;
    let ensemble = Ensemble {
        graph,
        table,
        statistics,
        metadata,
        profiles,
        profile_mapping,
        exclusive_metrics,
        inclusive_metrics,
        name_column: options.name_column.clone(),
    };

    // Step 6: validate
    report_step(options, 6, STEPS, "Validating ensemble");
    ensemble.validate()?;
    Ok((ensemble, realigned))
}

/// Join and rebind each dataset to the unified graph
///
/// Rebound datasets keep their own profile ids. Datasets are only touched
/// once the ensemble has validated.
pub(crate) fn join_in_place(
    datasets: &mut [ProfileDataset],
    headers: &[&str],
    key: Option<&str>,
    options: &ComposeOptions,
) -> Result<JoinedEnsemble, EnsembleError> {
    let (ensemble, realigned) = join_datasets(datasets, headers, key, options)?;
    for (dataset, table) in datasets.iter_mut().zip(realigned) {
        dataset.commit(Arc::clone(ensemble.graph()), table);
    }
    Ok(ensemble)
}

fn check_preconditions(datasets: &[ProfileDataset], headers: &[&str]) -> Result<(), EnsembleError> {
    if datasets.is_empty() {
        return Err(EnsembleError::EmptyInput);
    }
    if headers.len() != datasets.len() {
        return Err(EnsembleError::HeaderCountMismatch {
            headers: headers.len(),
            datasets: datasets.len(),
        });
    }
    let mut seen = BTreeSet::new();
    if let Some(repeated) = headers.iter().find(|h| !seen.insert(**h)) {
        return Err(EnsembleError::DuplicateHeader(repeated.to_string()));
    }

    let expected = vec![NODE_LEVEL.to_string(), PROFILE_LEVEL.to_string()];
    for dataset in datasets {
        if dataset.table().index_names() != expected.as_slice() {
            return Err(EnsembleError::InvalidIndexShape {
                expected,
                found: dataset.table().index_names().to_vec(),
            });
        }
    }
    Ok(())
}

/// Parallel join: the j-th profile of every dataset gets key `j`
fn positional_keys(
    datasets: &[ProfileDataset],
    headers: &[&str],
) -> Result<Vec<BTreeMap<ProfileId, IndexValue>>, EnsembleError> {
    let expected = datasets[0].profiles().len();
    datasets
        .iter()
        .zip(headers)
        .map(|(dataset, header)| -> Result<BTreeMap<ProfileId, IndexValue>, EnsembleError> {
            let found = dataset.profiles().len();
            if found != expected {
                return Err(EnsembleError::LengthMismatch {
                    header: header.to_string(),
                    expected,
                    found,
                });
            }
            Ok(dataset
                .profiles()
                .iter()
                .enumerate()
                .map(|(position, profile)| (profile.clone(), IndexValue::Int(position as i64)))
                .collect())
        })
        .collect()
}

/// Keyed join: each profile's key is its value of metadata field `field`
///
/// Two profiles of one dataset with the same key value are rejected.
fn metadata_keys(
    datasets: &[ProfileDataset],
    headers: &[&str],
    field: &str,
) -> Result<Vec<BTreeMap<ProfileId, IndexValue>>, EnsembleError> {
    let invalid = |header: &str, reason: String| EnsembleError::InvalidKey {
        key: field.to_string(),
        header: header.to_string(),
        reason,
    };

    let mut all = Vec::with_capacity(datasets.len());
    for (dataset, &header) in datasets.iter().zip(headers) {
        let column = dataset
            .metadata()
            .column_position(&field.to_string())
            .ok_or_else(|| invalid(header, "no such metadata field".to_string()))?;

        let mut keys = BTreeMap::new();
        let mut used = BTreeSet::new();
        for profile in dataset.profiles() {
            let row = dataset
                .metadata()
                .find_row(std::slice::from_ref(profile))
                .ok_or_else(|| invalid(header, format!("profile {} has no metadata", profile)))?;
            let value = &row.values[column];
            let key = value
                .to_index()
                .ok_or_else(|| invalid(header, format!("value {} of profile {} is not a usable key", value, profile)))?;
            if !used.insert(key.clone()) {
                return Err(EnsembleError::DuplicateKeyValue {
                    key: field.to_string(),
                    header: header.to_string(),
                    value: key.to_string(),
                });
            }
            keys.insert(profile.clone(), key);
        }
        all.push(keys);
    }
    Ok(all)
}

fn rekey(table: &SingleIndexedTable, keys: &BTreeMap<ProfileId, IndexValue>) -> Result<SingleIndexedTable, EnsembleError> {
    let mut rekeyed = table.clone();
    let level = rekeyed.level(PROFILE_LEVEL)?;
    rekeyed.map_level(level, |profile| {
        keys.get(profile)
            .cloned()
            .ok_or_else(|| EnsembleError::ProfileConsistency(format!("table row for unknown profile {}", profile)))
    })?;
    Ok(rekeyed)
}

/// Outer-join tables on their full index, one column block per header
///
/// Every table's name column is hoisted into a single top-level column.
fn join_tables(
    tables: &[SingleIndexedTable],
    headers: &[&str],
    name_column: &str,
) -> Result<ColumnJoinedTable, EnsembleError> {
    let mut columns = vec![Column::new(JoinedColumn::top(name_column), ColumnKind::Text)];
    let mut placements: Vec<Vec<Option<usize>>> = Vec::with_capacity(tables.len());
    for (table, header) in tables.iter().zip(headers) {
        let mut placement = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            if column.label.as_str() == name_column {
                // hoisted
                placement.push(None);
            } else {
                placement.push(Some(columns.len()));
                columns.push(Column::new(JoinedColumn::under(*header, column.label.as_str()), column.kind));
            }
        }
        placements.push(placement);
    }

    let blank: Vec<Value> = columns.iter().map(|c| c.kind.missing()).collect();
    let mut order: Vec<Vec<IndexValue>> = Vec::new();
    let mut rows: HashMap<Vec<IndexValue>, Vec<Value>> = HashMap::new();
    for (table, placement) in tables.iter().zip(&placements) {
        for row in table.rows() {
            let cells = rows.entry(row.index.clone()).or_insert_with(|| {
                order.push(row.index.clone());
                blank.clone()
            });
            for (value, target) in row.values.iter().zip(placement) {
                match target {
                    Some(position) => cells[*position] = value.clone(),
                    None if cells[0].is_absent() => cells[0] = value.clone(),
                    None => {}
                }
            }
        }
    }

    let mut joined = Table::new(vec![NODE_LEVEL.to_string(), PROFILE_LEVEL.to_string()], columns)?;
    for index in order {
        if let Some(values) = rows.remove(&index) {
            joined.push_row(index, values)?;
        }
    }
    debug!(
        "Joined {} tables into {} rows and {} columns",
        tables.len(),
        joined.len(),
        joined.columns().len()
    );
    Ok(joined)
}

/// Join metadata records on the join key
///
/// Each header block also records the original profile id, unless the
/// dataset already has a field with that name.
fn join_metadata(
    datasets: &[ProfileDataset],
    headers: &[&str],
    keys: &[BTreeMap<ProfileId, IndexValue>],
) -> Result<ColumnJoinedTable, EnsembleError> {
    let source_label = SOURCE_PROFILE_COLUMN.to_string();
    let mut blocks: Vec<SingleIndexedTable> = Vec::with_capacity(datasets.len());
    for (dataset, keys) in datasets.iter().zip(keys) {
        let mut block = dataset.metadata().clone();
        let level = block.level(PROFILE_LEVEL)?;
        if block.column_position(&source_label).is_none() {
            let numeric = block.rows().iter().all(|r| matches!(r.index[level], IndexValue::Int(_)));
            let kind = if numeric { ColumnKind::Numeric } else { ColumnKind::Text };
            block.add_column_with(Column::new(source_label.clone(), kind), |row| {
                if numeric {
                    row.index[level].to_value()
                } else {
                    Value::Text(row.index[level].to_string())
                }
            })?;
        }
        blocks.push(rekey(&block, keys)?);
    }

    let mut columns: Vec<Column<JoinedColumn>> = Vec::new();
    let mut offsets = Vec::with_capacity(blocks.len());
    for (block, header) in blocks.iter().zip(headers) {
        offsets.push(columns.len());
        columns.extend(
            block
                .columns()
                .iter()
                .map(|c| Column::new(JoinedColumn::under(*header, c.label.as_str()), c.kind)),
        );
    }

    let blank: Vec<Value> = columns.iter().map(|c| c.kind.missing()).collect();
    let mut order: Vec<Vec<IndexValue>> = Vec::new();
    let mut rows: HashMap<Vec<IndexValue>, Vec<Value>> = HashMap::new();
    for (block, offset) in blocks.iter().zip(offsets) {
        for row in block.rows() {
            let cells = rows.entry(row.index.clone()).or_insert_with(|| {
                order.push(row.index.clone());
                blank.clone()
            });
            for (position, value) in row.values.iter().enumerate() {
                cells[offset + position] = value.clone();
            }
        }
    }

    let mut joined = Table::new(vec![PROFILE_LEVEL.to_string()], columns)?;
    for index in order {
        if let Some(values) = rows.remove(&index) {
            joined.push_row(index, values)?;
        }
    }
    Ok(joined)
}
