//! Stack and join command implementations.
//!
//! Both commands:
//! 1. Resolve compose options (defaults, TOML file, flags)
//! 2. Read the input datasets
//! 3. Compose them
//! 4. Write the ensemble

use super::models::{JoinArgs, StackArgs};
use crate::ensemble::{Ensemble, EnsembleComposer, ProfileDataset};
use crate::output::{read_dataset, write_ensemble};
use crate::table::ColumnLabel;
use crate::utils::config::{load_options, ComposeOptions};
use anyhow::{Context, Result};
use colored::*;
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Execute the stack command
///
/// # Example
/// ```ignore
/// let args = StackArgs {
///     inputs: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
///     ..Default::default()
/// };
/// execute_stack(args)?;
/// ```
pub fn execute_stack(args: StackArgs) -> Result<()> {
    let start_time = Instant::now();
    info!("Stacking {} datasets", args.inputs.len());

    info!("Step 1/4: Resolving options...");
    let mut options = resolve_options(args.config.as_deref())?;
    if !args.fill_missing {
        options = options.with_fill_missing(false);
    }
    debug!("Compose options: {:?}", options);

    info!("Step 2/4: Reading datasets...");
    let datasets = read_inputs(&args.inputs)?;

    info!("Step 3/4: Stacking...");
    let ensemble = EnsembleComposer::new(options)
        .stack(&datasets)
        .context("Failed to stack datasets")?;

    info!("Step 4/4: Writing ensemble...");
    write_ensemble(&ensemble, &args.output).context("Failed to write ensemble JSON")?;
    info!("✓ Ensemble written to: {}", args.output.display());

    if args.print_summary {
        print_summary("STACKED ENSEMBLE", &ensemble);
    }

    info!("Stack completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Execute the join command
pub fn execute_join(args: JoinArgs) -> Result<()> {
    let start_time = Instant::now();
    info!("Joining {} datasets under {:?}", args.inputs.len(), args.headers);

    info!("Step 1/4: Resolving options...");
    let options = resolve_options(args.config.as_deref())?;

    info!("Step 2/4: Reading datasets...");
    let datasets = read_inputs(&args.inputs)?;

    info!("Step 3/4: Joining...");
    let headers: Vec<&str> = args.headers.iter().map(String::as_str).collect();
    let ensemble = EnsembleComposer::new(options)
        .columnar_join(&datasets, &headers, args.key.as_deref())
        .context("Failed to join datasets")?;

    info!("Step 4/4: Writing ensemble...");
    write_ensemble(&ensemble, &args.output).context("Failed to write ensemble JSON")?;
    info!("✓ Ensemble written to: {}", args.output.display());

    if args.print_summary {
        print_summary("JOINED ENSEMBLE", &ensemble);
    }

    info!("Join completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Validate stack arguments
///
/// **Public** - can be called before execute_stack for early validation
pub fn validate_stack_args(args: &StackArgs) -> Result<()> {
    validate_inputs(&args.inputs, &args.output)
}

/// Validate join arguments
pub fn validate_join_args(args: &JoinArgs) -> Result<()> {
    validate_inputs(&args.inputs, &args.output)?;

    if args.headers.len() != args.inputs.len() {
        anyhow::bail!(
            "Expected one header per input ({} inputs, {} headers)",
            args.inputs.len(),
            args.headers.len()
        );
    }

    if args.headers.iter().any(|h| h.trim().is_empty()) {
        anyhow::bail!("Headers cannot be empty");
    }

    let distinct: BTreeSet<&String> = args.headers.iter().collect();
    if distinct.len() != args.headers.len() {
        anyhow::bail!("Headers must be unique");
    }

    if matches!(&args.key, Some(key) if key.trim().is_empty()) {
        anyhow::bail!("Join key cannot be empty");
    }

    Ok(())
}

fn validate_inputs(inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("At least one input dataset is required");
    }

    let distinct: BTreeSet<&PathBuf> = inputs.iter().collect();
    if distinct.len() != inputs.len() {
        anyhow::bail!("The same input dataset is listed twice");
    }

    if inputs.iter().any(|i| i == output) {
        anyhow::bail!("Output path {} would overwrite an input", output.display());
    }

    Ok(())
}

fn resolve_options(config: Option<&Path>) -> Result<ComposeOptions> {
    let options = match config {
        Some(path) => load_options(path)
            .with_context(|| format!("Failed to load compose options from {}", path.display()))?,
        None => ComposeOptions::default(),
    };
    options.check()?;
    Ok(options)
}

fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<ProfileDataset>> {
    inputs
        .iter()
        .map(|path| -> Result<ProfileDataset> {
            let dataset = read_dataset(path).with_context(|| format!("Failed to read dataset {}", path.display()))?;
            debug!("Read {}: {} profiles", path.display(), dataset.profiles().len());
            Ok(dataset)
        })
        .collect()
}

fn print_summary<K: ColumnLabel>(title: &str, ensemble: &Ensemble<K>) {
    println!("\n{}", "=".repeat(80));
    println!("{}", title.bold());
    println!("{}", "=".repeat(80));
    println!("Nodes:     {}", ensemble.graph().len().to_string().cyan());
    println!("Profiles:  {}", ensemble.profiles().len().to_string().cyan());
    println!("Rows:      {}", ensemble.table().len().to_string().cyan());
    let columns: Vec<String> = ensemble.table().columns().iter().map(|c| c.label.to_string()).collect();
    println!("Columns:   {}", columns.join(", "));
    let metrics: Vec<String> = ensemble.exclusive_metrics().iter().map(|m| m.to_string()).collect();
    println!("Exclusive: {}", metrics.join(", "));
    let metrics: Vec<String> = ensemble.inclusive_metrics().iter().map(|m| m.to_string()).collect();
    println!("Inclusive: {}", metrics.join(", "));
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_args(inputs: &[&str]) -> StackArgs {
        StackArgs {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_stack_args_valid() {
        assert!(validate_stack_args(&stack_args(&["a.json", "b.json"])).is_ok());
    }

    #[test]
    fn test_validate_stack_args_no_inputs() {
        assert!(validate_stack_args(&stack_args(&[])).is_err());
    }

    #[test]
    fn test_validate_stack_args_repeated_input() {
        assert!(validate_stack_args(&stack_args(&["a.json", "a.json"])).is_err());
    }

    #[test]
    fn test_validate_stack_args_output_is_input() {
        let args = StackArgs {
            output: PathBuf::from("a.json"),
            ..stack_args(&["a.json", "b.json"])
        };
        assert!(validate_stack_args(&args).is_err());
    }

    #[test]
    fn test_validate_join_args_header_count() {
        let args = JoinArgs {
            inputs: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            headers: vec!["A".to_string()],
            ..Default::default()
        };
        assert!(validate_join_args(&args).is_err());
    }

    #[test]
    fn test_validate_join_args_duplicate_headers() {
        let args = JoinArgs {
            inputs: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            headers: vec!["A".to_string(), "A".to_string()],
            ..Default::default()
        };
        assert!(validate_join_args(&args).is_err());
    }

    #[test]
    fn test_validate_join_args_empty_key() {
        let args = JoinArgs {
            inputs: vec![PathBuf::from("a.json")],
            headers: vec!["A".to_string()],
            key: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(validate_join_args(&args).is_err());

        let args = JoinArgs { key: Some("ranks".to_string()), ..args };
        assert!(validate_join_args(&args).is_ok());
    }
}
