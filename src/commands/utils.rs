use crate::ensemble::Ensemble;
use crate::output::{read_dataset, read_header, read_joined, read_stacked, PayloadKind};
use crate::table::ColumnLabel;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;

/// Validate a dataset or ensemble JSON file
///
/// Reading runs every consistency check, so a file that loads is valid.
pub fn validate_file(file_path: PathBuf) -> Result<()> {
    println!("Validating: {}", file_path.display());

    let header = read_header(&file_path).context("Failed to read file header")?;
    match header.kind {
        PayloadKind::Dataset => {
            let dataset = read_dataset(&file_path)?;
            println!("{}", "✓ Valid dataset JSON".green());
            println!("  Version: {}", header.version);
            println!("  Generated: {}", header.generated_at);
            println!("  Nodes: {}", dataset.graph().len());
            println!("  Profiles: {}", dataset.profiles().len());
            println!("  Rows: {}", dataset.table().len());
        }
        PayloadKind::Stacked => print_ensemble(&header.version, &read_stacked(&file_path)?),
        PayloadKind::Joined => print_ensemble(&header.version, &read_joined(&file_path)?),
    }

    Ok(())
}

fn print_ensemble<K: ColumnLabel>(version: &str, ensemble: &Ensemble<K>) {
    println!("{}", "✓ Valid ensemble JSON".green());
    println!("  Version: {}", version);
    println!("  {}", ensemble.summary());
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("{}", "Callpath Ensemble File Schema".bold());
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Envelope:");
        println!("  version: string           - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string      - ISO 8601 timestamp");
        println!("  kind: string              - 'dataset', 'stacked' or 'joined'");
        println!("  payload: object           - The dataset or ensemble");
        println!();
        println!("Dataset payload:");
        println!("  graph: object             - Call graph (nodes with frame, children, parents, ordinal; roots)");
        println!("  table: object             - Measurements indexed by (node, profile)");
        println!("  metadata: object          - One record per profile, indexed by profile");
        println!("  profiles: array           - Profile ids in order");
        println!("  profile_mapping: array    - [profile id, [source, ...]] pairs");
        println!("  exclusive_metrics: array  - Metrics excluding children");
        println!("  inclusive_metrics: array  - Metrics including children");
        println!();
        println!("Ensemble payload adds:");
        println!("  statistics: object        - One row per unified node");
        println!("  name_column: string       - Display-name column");
        println!("  (joined ensembles label columns as {{header, name}})");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Callpath Ensemble v{}", env!("CARGO_PKG_VERSION"));
    println!("File Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Unifies call graphs of several profiles and composes their tables.");
}
