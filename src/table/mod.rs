//! Measurement and metadata tables.
//!
//! This module handles:
//! - Cell values with kind-aware missing markers
//! - Tables with named index levels, in single and column-joined variants
//! - Realigning a table's node level to unified node identities

pub mod data;
pub mod realign;
pub mod value;

// Re-export main types
pub use data::{Column, ColumnJoinedTable, ColumnLabel, JoinedColumn, Row, SingleIndexedTable, Table};
pub use realign::TableRealigner;
pub use value::{ColumnKind, IndexValue, ProfileId, Value};
