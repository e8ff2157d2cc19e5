//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while unifying graphs, realigning tables or composing ensembles
///
/// Every variant is fatal. Composition either returns a validated ensemble
/// or one of these, never a half-merged result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("Structural mismatch at {position}: frame {left} is incompatible with {right}")]
    StructuralMismatch {
        position: String,
        left: String,
        right: String,
    },

    #[error("Duplicate profile id {0} across input datasets")]
    DuplicateProfileId(String),

    #[error("Duplicate column header: {0}")]
    DuplicateHeader(String),

    #[error("Got {headers} headers for {datasets} datasets")]
    HeaderCountMismatch { headers: usize, datasets: usize },

    #[error("Profile count mismatch: dataset '{header}' has {found} profiles, expected {expected}")]
    LengthMismatch {
        header: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid join key '{key}' for dataset '{header}': {reason}")]
    InvalidKey {
        key: String,
        header: String,
        reason: String,
    },

    #[error("Join key '{key}' has duplicate value {value} in dataset '{header}'")]
    DuplicateKeyValue {
        key: String,
        header: String,
        value: String,
    },

    #[error("Corrupted node mapping: {old} -> {new}")]
    CorruptedMapping { old: String, new: String },

    #[error("Duplicate index key: {0}")]
    DuplicateIndex(String),

    #[error("Missing or misplaced ordinal: {0}")]
    MissingOrdinal(String),

    #[error("Name mismatch for node {node}: row says '{found}', frame says '{expected}'")]
    NameConsistency {
        node: String,
        found: String,
        expected: String,
    },

    #[error("Node {0} is referenced by a table but not reachable in the graph")]
    DanglingNode(String),

    #[error("Profile sets disagree: {0}")]
    ProfileConsistency(String),

    #[error("Expected index levels {expected:?}, found {found:?}")]
    InvalidIndexShape {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Index level '{0}' not found")]
    MissingIndexLevel(String),

    #[error("Column {column} is {left} in one table and {right} in another")]
    ColumnKindConflict {
        column: String,
        left: String,
        right: String,
    },

    #[error("Row shape mismatch: {0}")]
    RowShape(String),

    #[error("Column {0} is not a profile-level column")]
    NotAProfileColumn(String),

    #[error("Invalid call graph: {0}")]
    InvalidGraph(String),

    #[error("Nothing to compose: no input datasets")]
    EmptyInput,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    ReadFailed { path: String, source: std::io::Error },

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(String),

    #[error("Expected a {expected} file, found a {found} file")]
    UnexpectedKind { expected: String, found: String },

    #[error("Persisted data is inconsistent: {0}")]
    Inconsistent(#[from] EnsembleError),
}

/// Errors that can occur while loading compose options
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Options TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid option: {0}")]
    Invalid(String),
}
