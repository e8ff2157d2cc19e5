//! JSON persistence for datasets and ensembles.
//!
//! Every file is an envelope carrying the schema version, a timestamp and
//! the kind of payload, so a reader can refuse files it does not understand.
//! Node ids are written as-is; reading a file back yields the same ids and
//! the same rows.

use crate::ensemble::{Ensemble, JoinedEnsemble, ProfileDataset, StackedEnsemble};
use crate::table::ColumnLabel;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// What an envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Dataset,
    Stacked,
    Joined,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Dataset => write!(f, "dataset"),
            PayloadKind::Stacked => write!(f, "stacked ensemble"),
            PayloadKind::Joined => write!(f, "joined ensemble"),
        }
    }
}

/// Envelope fields, readable without knowing the payload type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    /// Schema version (e.g. "1.0.0")
    pub version: String,

    /// ISO 8601 timestamp of when the file was written
    pub generated_at: String,

    pub kind: PayloadKind,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(flatten)]
    header: FileHeader,
    payload: T,
}

/// Ensemble layouts an ensemble file can hold
pub trait EnsembleLayout: ColumnLabel {
    const KIND: PayloadKind;
}

impl EnsembleLayout for String {
    const KIND: PayloadKind = PayloadKind::Stacked;
}

impl EnsembleLayout for crate::table::JoinedColumn {
    const KIND: PayloadKind = PayloadKind::Joined;
}

/// Write a dataset to a JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_dataset(dataset: &ProfileDataset, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    write_envelope(PayloadKind::Dataset, dataset, output_path.as_ref())
}

/// Read a dataset and check that its graph and tables agree
///
/// # Errors
/// * `OutputError::ReadFailed` - the file cannot be opened
/// * `OutputError::UnsupportedVersion` - written by another schema version
/// * `OutputError::UnexpectedKind` - the file holds something else
/// * `OutputError::Inconsistent` - graph and tables disagree
pub fn read_dataset(input_path: impl AsRef<Path>) -> Result<ProfileDataset, OutputError> {
    let dataset: ProfileDataset = read_envelope(PayloadKind::Dataset, input_path.as_ref())?;
    dataset.check()?;
    debug!("Dataset loaded: {} profiles, {} rows", dataset.profiles().len(), dataset.table().len());
    Ok(dataset)
}

/// Write a stacked or joined ensemble to a JSON file
///
/// # Example
/// ```ignore
/// let ensemble = stack(&datasets, true)?;
/// write_ensemble(&ensemble, "ensemble.json")?;
/// ```
pub fn write_ensemble<K: EnsembleLayout>(ensemble: &Ensemble<K>, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    write_envelope(K::KIND, ensemble, output_path.as_ref())
}

/// Read an ensemble and re-run every consistency check on it
///
/// # Errors
/// * `OutputError::ReadFailed` - the file cannot be opened
/// * `OutputError::UnsupportedVersion` - written by another schema version
/// * `OutputError::UnexpectedKind` - the file holds the other layout or a dataset
/// * `OutputError::Inconsistent` - the ensemble violates an invariant
pub fn read_ensemble<K: EnsembleLayout>(input_path: impl AsRef<Path>) -> Result<Ensemble<K>, OutputError> {
    let ensemble: Ensemble<K> = read_envelope(K::KIND, input_path.as_ref())?;
    ensemble.validate()?;
    debug!("Ensemble loaded: {}", ensemble.summary());
    Ok(ensemble)
}

pub fn read_stacked(input_path: impl AsRef<Path>) -> Result<StackedEnsemble, OutputError> {
    read_ensemble(input_path)
}

pub fn read_joined(input_path: impl AsRef<Path>) -> Result<JoinedEnsemble, OutputError> {
    read_ensemble(input_path)
}

/// Read only the envelope fields of a file
pub fn read_header(input_path: impl AsRef<Path>) -> Result<FileHeader, OutputError> {
    let file = open_for_read(input_path.as_ref())?;
    let header: FileHeader = serde_json::from_reader(BufReader::new(file))?;
    Ok(header)
}

fn write_envelope<T: Serialize>(kind: PayloadKind, payload: &T, output_path: &Path) -> Result<(), OutputError> {
    info!("Writing {} to: {}", kind, output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!("Cannot create directory {}: {}", parent.display(), e))
            })?;
        }
    }

    let envelope = Envelope {
        header: FileHeader {
            version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            kind,
        },
        payload,
    };

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &envelope).map_err(OutputError::SerializationFailed)?;

    info!("Written successfully ({} bytes)", calculate_file_size(output_path));
    Ok(())
}

fn read_envelope<T: DeserializeOwned>(expected: PayloadKind, input_path: &Path) -> Result<T, OutputError> {
    debug!("Reading {} from: {}", expected, input_path.display());

    // Check the header first so a wrong file fails with a clear error
    let header = read_header(input_path)?;
    if header.version != SCHEMA_VERSION {
        return Err(OutputError::UnsupportedVersion(header.version));
    }
    if header.kind != expected {
        return Err(OutputError::UnexpectedKind {
            expected: expected.to_string(),
            found: header.kind.to_string(),
        });
    }

    let file = open_for_read(input_path)?;
    let envelope: Envelope<T> = serde_json::from_reader(BufReader::new(file))?;
    debug!("Loaded file generated at {}", envelope.header.generated_at);
    Ok(envelope.payload)
}

fn open_for_read(path: &Path) -> Result<File, OutputError> {
    File::open(path).map_err(|source| OutputError::ReadFailed {
        path: path.display().to_string(),
        source,
    })
}

/// Validate that output path is writable
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!("Path is a directory: {}", path.display())));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
