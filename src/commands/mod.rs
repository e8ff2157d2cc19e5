//! CLI command implementations.
//!
//! Commands orchestrate the library components to perform user tasks.

pub mod compose;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use compose::{execute_join, execute_stack, validate_join_args, validate_stack_args};
pub use models::{JoinArgs, StackArgs};
pub use utils::{display_schema, display_version, validate_file};
