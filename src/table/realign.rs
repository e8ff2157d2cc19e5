//! Rewrite the node level of a table through a node map.

use super::data::{ColumnLabel, Table};
use super::value::IndexValue;
use crate::graph::NodeMap;
use crate::utils::error::EnsembleError;
use log::debug;

/// Points table rows at unified node identities
pub struct TableRealigner;

impl TableRealigner {
    /// Return a copy of `table` whose `level_name` values went through `map`
    ///
    /// Other levels and all cells are left untouched. Row order is whatever
    /// the input had; callers sort afterwards.
    ///
    /// # Errors
    /// * `EnsembleError::MissingIndexLevel` - no level called `level_name`
    /// * `EnsembleError::CorruptedMapping` - a row names a node the map lacks
    pub fn realign<K: ColumnLabel>(
        table: &Table<K>,
        map: &NodeMap,
        level_name: &str,
    ) -> Result<Table<K>, EnsembleError> {
        let mut realigned = table.clone();
        Self::realign_in_place(&mut realigned, map, level_name)?;
        Ok(realigned)
    }

    /// Same as [`TableRealigner::realign`], rewriting `table` itself
    pub fn realign_in_place<K: ColumnLabel>(
        table: &mut Table<K>,
        map: &NodeMap,
        level_name: &str,
    ) -> Result<(), EnsembleError> {
        let level = table.level(level_name)?;
        table.map_level(level, |value| match value {
            IndexValue::Node(old) => map
                .get(*old)
                .map(IndexValue::Node)
                .ok_or_else(|| EnsembleError::CorruptedMapping {
                    old: old.to_string(),
                    new: "absent from node map".to_string(),
                }),
            other => Err(EnsembleError::CorruptedMapping {
                old: other.to_string(),
                new: format!("level '{}' holds a non-node value", level_name),
            }),
        })?;
        debug!("Realigned {} rows on level '{}'", table.len(), level_name);
        Ok(())
    }
}
