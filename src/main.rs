//! Callpath Ensemble CLI
//!
//! Stacks or joins persisted profile datasets into one ensemble whose
//! call graphs have been unified.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use callpath_ensemble::commands::{
    display_schema, display_version, execute_join, execute_stack, validate_file, validate_join_args,
    validate_stack_args, JoinArgs, StackArgs,
};

/// Callpath Ensemble - unify call graphs across profiles
#[derive(Parser, Debug)]
#[command(name = "callpath-ensemble")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Stack datasets as rows over one unified graph
    Stack {
        /// Dataset JSON files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output path for the ensemble JSON
        #[arg(short, long, default_value = "ensemble.json")]
        output: PathBuf,

        /// Do not materialize absent (node, profile) rows
        #[arg(long)]
        no_fill: bool,

        /// TOML file with compose options
        #[arg(short, long, env = "CALLPATH_ENSEMBLE_CONFIG")]
        config: Option<PathBuf>,

        /// Print a summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Join datasets side by side as labeled column blocks
    Join {
        /// Dataset JSON files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// One header per input, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        headers: Vec<String>,

        /// Metadata field to pair profiles by (positional when omitted)
        #[arg(short, long)]
        key: Option<String>,

        /// Output path for the ensemble JSON
        #[arg(short, long, default_value = "ensemble.json")]
        output: PathBuf,

        /// TOML file with compose options
        #[arg(short, long, env = "CALLPATH_ENSEMBLE_CONFIG")]
        config: Option<PathBuf>,

        /// Print a summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a dataset or ensemble JSON file
    Validate {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Stack {
            inputs,
            output,
            no_fill,
            config,
            summary,
        } => {
            let args = StackArgs {
                inputs,
                output,
                fill_missing: !no_fill,
                config,
                print_summary: summary,
            };
            validate_stack_args(&args)?;
            execute_stack(args)?;
        }

        Commands::Join {
            inputs,
            headers,
            key,
            output,
            config,
            summary,
        } => {
            let args = JoinArgs {
                inputs,
                headers,
                key,
                output,
                config,
                print_summary: summary,
            };
            validate_join_args(&args)?;
            execute_join(args)?;
        }

        Commands::Validate { file } => {
            validate_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
