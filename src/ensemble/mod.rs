//! Ensemble composition.
//!
//! This module handles:
//! - Owning datasets that keep a graph and its tables in step
//! - Stacking profiles as rows over a unified node space
//! - Joining profiles as labeled column blocks
//! - Validating the composed ensemble

pub mod dataset;
mod join;
pub mod model;
mod stack;
pub mod validate;

// Re-export main types
pub use dataset::{ProfileDataset, ReaderOutput};
pub use model::{Ensemble, JoinedEnsemble, ProfileMapping, StackedEnsemble};

use crate::utils::config::ComposeOptions;
use crate::utils::error::EnsembleError;
use log::{debug, info};

/// Composes datasets into ensembles with a fixed set of options
///
/// Plain calls borrow the inputs and leave them untouched. The `_in_place`
/// variants additionally rebind every input dataset to the unified graph,
/// and only once the result has validated.
#[derive(Debug, Clone, Default)]
pub struct EnsembleComposer {
    options: ComposeOptions,
}

impl EnsembleComposer {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Stack profiles as rows
    ///
    /// # Errors
    /// * `EnsembleError::EmptyInput` - no datasets
    /// * `EnsembleError::DuplicateProfileId` - two datasets share a profile id
    /// * `EnsembleError::StructuralMismatch` - graphs disagree at a position
    /// * any validator error if the result is inconsistent
    pub fn stack(&self, datasets: &[ProfileDataset]) -> Result<StackedEnsemble, EnsembleError> {
        let (ensemble, _) = stack::stack_datasets(datasets, &self.options)?;
        info!("Stacked {} datasets: {}", datasets.len(), ensemble.summary());
        Ok(ensemble)
    }

    pub fn stack_in_place(&self, datasets: &mut [ProfileDataset]) -> Result<StackedEnsemble, EnsembleError> {
        let ensemble = stack::stack_in_place(datasets, &self.options)?;
        info!("Stacked {} datasets in place: {}", datasets.len(), ensemble.summary());
        Ok(ensemble)
    }

    /// Join profiles as column blocks labeled by `headers`
    ///
    /// `key` names a metadata field to pair profiles by; without it the
    /// j-th profiles of all datasets are paired.
    ///
    /// # Errors
    /// * `EnsembleError::HeaderCountMismatch` - one header per dataset is required
    /// * `EnsembleError::DuplicateHeader` - two datasets share a header
    /// * `EnsembleError::InvalidIndexShape` - a table is not indexed by (node, profile)
    /// * `EnsembleError::LengthMismatch` - positional join with unequal profile counts
    /// * `EnsembleError::InvalidKey` - `key` is absent or not usable as an index
    /// * `EnsembleError::DuplicateKeyValue` - two profiles of one dataset share a key value
    pub fn columnar_join(
        &self,
        datasets: &[ProfileDataset],
        headers: &[&str],
        key: Option<&str>,
    ) -> Result<JoinedEnsemble, EnsembleError> {
        let (ensemble, _) = join::join_datasets(datasets, headers, key, &self.options)?;
        info!("Joined {} datasets: {}", datasets.len(), ensemble.summary());
        Ok(ensemble)
    }

    pub fn columnar_join_in_place(
        &self,
        datasets: &mut [ProfileDataset],
        headers: &[&str],
        key: Option<&str>,
    ) -> Result<JoinedEnsemble, EnsembleError> {
        let ensemble = join::join_in_place(datasets, headers, key, &self.options)?;
        info!("Joined {} datasets in place: {}", datasets.len(), ensemble.summary());
        Ok(ensemble)
    }
}

/// Stack with default options apart from `fill_missing`
pub fn stack(datasets: &[ProfileDataset], fill_missing: bool) -> Result<StackedEnsemble, EnsembleError> {
    EnsembleComposer::new(ComposeOptions::default().with_fill_missing(fill_missing)).stack(datasets)
}

/// Columnar join with default options
pub fn columnar_join(
    datasets: &[ProfileDataset],
    headers: &[&str],
    key: Option<&str>,
) -> Result<JoinedEnsemble, EnsembleError> {
    EnsembleComposer::default().columnar_join(datasets, headers, key)
}

pub(crate) fn report_step(options: &ComposeOptions, step: usize, total: usize, message: &str) {
    if options.progress {
        info!("Step {}/{}: {}", step, total, message);
    } else {
        debug!("Step {}/{}: {}", step, total, message);
    }
}
