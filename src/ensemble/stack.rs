//! Row-union composition: profiles become extra rows over one node space.

use super::dataset::ProfileDataset;
use super::model::{sort_by_node, statistics_for, union_labels, Ensemble, ProfileMapping, StackedEnsemble};
use super::report_step;
use crate::graph::CallGraph;
use crate::table::{IndexValue, ProfileId, SingleIndexedTable, Table, TableRealigner};
use crate::unify::{GraphUnifier, NodeRemapPropagator};
use crate::utils::config::{ComposeOptions, NODE_LEVEL};
use crate::utils::error::EnsembleError;
use log::debug;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const STEPS: usize = 6;

/// Stack `datasets` into one ensemble
///
/// Returns the ensemble plus each dataset's table realigned to the unified
/// graph, so the in-place variant can rebind the inputs afterwards.
pub(crate) fn stack_datasets(
    datasets: &[ProfileDataset],
    options: &ComposeOptions,
) -> Result<(StackedEnsemble, Vec<SingleIndexedTable>), EnsembleError> {
    if datasets.is_empty() {
        return Err(EnsembleError::EmptyInput);
    }
    check_unique_profiles(datasets)?;

    // Step 1: unify graphs
    report_step(options, 1, STEPS, &format!("Unifying {} call graphs", datasets.len()));
    let graphs: Vec<Arc<CallGraph>> = datasets.iter().map(|d| Arc::clone(d.graph())).collect();
    let unification = GraphUnifier::new().with_progress(options.progress).unify(&graphs)?;
    let graph = Arc::clone(unification.graph());

    // Step 2: realign every table to the unified nodes
    report_step(options, 2, STEPS, "Realigning measurement tables");
    let propagator = NodeRemapPropagator::new(&unification);
    let realigned = datasets
        .iter()
        .enumerate()
        .map(|(index, dataset)| {
            let map = propagator.flatten(index, dataset.graph())?;
            TableRealigner::realign(dataset.table(), &map, NODE_LEVEL)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Step 3: concatenate, optionally fill, sort
    report_step(options, 3, STEPS, "Stacking tables");
    let mut table = Table::stack(realigned.clone())?;
    if options.fill_missing {
        let filled = fill_missing(&mut table, &graph)?;
        debug!("Filled {} absent (node, profile) rows", filled);
    }
    sort_by_node(&mut table, &graph)?;

    // Step 4: metadata, profiles, mapping, metrics
    report_step(options, 4, STEPS, "Merging metadata");
    let metadata = Table::stack(datasets.iter().map(|d| d.metadata().clone()).collect())?;
    let profiles: Vec<ProfileId> = datasets.iter().flat_map(|d| d.profiles().iter().cloned()).collect();
    let mut profile_mapping = ProfileMapping::new();
    for dataset in datasets {
        for (profile, sources) in dataset.profile_mapping() {
            profile_mapping.entry(profile.clone()).or_default().extend(sources.iter().cloned());
        }
    }
    let mut exclusive_metrics = Vec::new();
    let mut inclusive_metrics = Vec::new();
    for dataset in datasets {
        union_labels(&mut exclusive_metrics, dataset.exclusive_metrics().iter().cloned());
        union_labels(&mut inclusive_metrics, dataset.inclusive_metrics().iter().cloned());
    }

    // Step 5: statistics start over with names only
    report_step(options, 5, STEPS, "Resetting statistics table");
    let statistics = statistics_for(&graph, options.name_column.clone())?;

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

/// Stack and rebind each dataset to the unified graph
///
/// Datasets are only touched once the ensemble has validated.
pub(crate) fn stack_in_place(
    datasets: &mut [ProfileDataset],
    options: &ComposeOptions,
) -> Result<StackedEnsemble, EnsembleError> {
    let (ensemble, realigned) = stack_datasets(datasets, options)?;
    for (dataset, table) in datasets.iter_mut().zip(realigned) {
        dataset.commit(Arc::clone(ensemble.graph()), table);
    }
    Ok(ensemble)
}

fn check_unique_profiles(datasets: &[ProfileDataset]) -> Result<(), EnsembleError> {
    let mut seen = BTreeSet::new();
    for profile in datasets.iter().flat_map(|d| d.profiles()) {
        if !seen.insert(profile) {
            return Err(EnsembleError::DuplicateProfileId(profile.to_string()));
        }
    }
    Ok(())
}

/// Materialize every (node, other levels) combination that has no row
///
/// The other-level tuples are the ones actually present in the table.
/// Filled cells get the missing marker of their column kind. Returns the
/// number of rows added.
fn fill_missing(table: &mut SingleIndexedTable, graph: &CallGraph) -> Result<usize, EnsembleError> {
    let node_level = table.level(NODE_LEVEL)?;
    let strip = |index: &[IndexValue]| -> Vec<IndexValue> {
        index
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != node_level)
            .map(|(_, v)| v.clone())
            .collect()
    };

    let mut seen_tuples = HashSet::new();
    let mut tuples: Vec<Vec<IndexValue>> = Vec::new();
    for row in table.rows() {
        let tuple = strip(&row.index);
        if seen_tuples.insert(tuple.clone()) {
            tuples.push(tuple);
        }
    }
    let present: HashSet<Vec<IndexValue>> = table.rows().iter().map(|r| r.index.clone()).collect();
    let blank: Vec<_> = table.columns().iter().map(|c| c.kind.missing()).collect();

    let mut added = 0;
    for node in graph.traverse() {
        for tuple in &tuples {
            let mut index = tuple.clone();
            index.insert(node_level, IndexValue::Node(node));
            if !present.contains(&index) {
                table.push_row(index, blank.clone())?;
                added += 1;
            }
        }
    }
    Ok(added)
}
