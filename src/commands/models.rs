use std::path::PathBuf;

/// Arguments for the stack command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct StackArgs {
    /// Persisted datasets to stack
    pub inputs: Vec<PathBuf>,

    /// Output path for the ensemble JSON
    pub output: PathBuf,

    /// Materialize every (node, profile) pair
    pub fill_missing: bool,

    /// Optional TOML file with compose options
    pub config: Option<PathBuf>,

    /// Print a summary to stdout
    pub print_summary: bool,
}

impl Default for StackArgs {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("ensemble.json"),
            fill_missing: true,
            config: None,
            print_summary: false,
        }
    }
}

/// Arguments for the join command
#[derive(Debug, Clone)]
pub struct JoinArgs {
    /// Persisted datasets to join
    pub inputs: Vec<PathBuf>,

    /// One header label per input
    pub headers: Vec<String>,

    /// Metadata field to pair profiles by (positional when absent)
    pub key: Option<String>,

    /// Output path for the ensemble JSON
    pub output: PathBuf,

    /// Optional TOML file with compose options
    pub config: Option<PathBuf>,

    /// Print a summary to stdout
    pub print_summary: bool,
}

impl Default for JoinArgs {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            headers: Vec::new(),
            key: None,
            output: PathBuf::from("ensemble.json"),
            config: None,
            print_summary: false,
        }
    }
}
