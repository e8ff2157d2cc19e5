//! Tables keyed by named index levels.
//!
//! A table has one or more named index levels (for example `node` and
//! `profile`), a list of typed columns and rows of cells. The column label
//! type decides the variant:
//! - `SingleIndexedTable` labels columns with a plain name
//! - `ColumnJoinedTable` labels columns with `(header, name)`

use super::value::{ColumnKind, IndexValue, Value};
use crate::utils::error::EnsembleError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

/// Column label of a table variant
pub trait ColumnLabel:
    Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned
{
    /// True for the display-name column called `name_column`
    fn is_name(&self, name_column: &str) -> bool;
}

impl ColumnLabel for String {
    fn is_name(&self, name_column: &str) -> bool {
        self == name_column
    }
}

/// Two-level column label produced by a columnar join
///
/// `header == None` marks a top-level column shared by every header block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JoinedColumn {
    pub header: Option<String>,
    pub name: String,
}

impl JoinedColumn {
    pub fn top(name: impl Into<String>) -> Self {
        Self {
            header: None,
            name: name.into(),
        }
    }

    pub fn under(header: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
            name: name.into(),
        }
    }
}

impl ColumnLabel for JoinedColumn {
    fn is_name(&self, name_column: &str) -> bool {
        self.header.is_none() && self.name == name_column
    }
}

impl fmt::Display for JoinedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.header {
            Some(header) => write!(f, "({}, {})", header, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Typed column declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column<K> {
    pub label: K,
    pub kind: ColumnKind,
}

impl<K> Column<K> {
    pub fn new(label: K, kind: ColumnKind) -> Self {
        Self { label, kind }
    }
}

/// One row: index key plus one cell per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub index: Vec<IndexValue>,
    pub values: Vec<Value>,
}

/// Table with named index levels and typed columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table<K> {
    index_names: Vec<String>,
    columns: Vec<Column<K>>,
    rows: Vec<Row>,
}

/// Table with a single column level
pub type SingleIndexedTable = Table<String>;

/// Table with `(header, name)` column labels
pub type ColumnJoinedTable = Table<JoinedColumn>;

impl<K: ColumnLabel> Table<K> {
    /// Create an empty table
    ///
    /// # Errors
    /// * `EnsembleError::InvalidIndexShape` - no index levels or repeated level names
    /// * `EnsembleError::RowShape` - repeated column labels
    pub fn new(index_names: Vec<String>, columns: Vec<Column<K>>) -> Result<Self, EnsembleError> {
        let distinct: BTreeSet<&String> = index_names.iter().collect();
        if index_names.is_empty() || distinct.len() != index_names.len() {
            return Err(EnsembleError::InvalidIndexShape {
                expected: vec!["distinct level names".to_string()],
                found: index_names,
            });
        }
        let labels: BTreeSet<&K> = columns.iter().map(|c| &c.label).collect();
        if labels.len() != columns.len() {
            return Err(EnsembleError::RowShape("repeated column label".to_string()));
        }
        Ok(Self {
            index_names,
            columns,
            rows: Vec::new(),
        })
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn columns(&self) -> &[Column<K>] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the index level called `name`
    pub fn level(&self, name: &str) -> Result<usize, EnsembleError> {
        self.index_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| EnsembleError::MissingIndexLevel(name.to_string()))
    }

    pub fn column_position(&self, label: &K) -> Option<usize> {
        self.columns.iter().position(|c| &c.label == label)
    }

    pub fn name_position(&self, name_column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label.is_name(name_column))
    }

    pub fn get(&self, row: usize, label: &K) -> Option<&Value> {
        let column = self.column_position(label)?;
        self.rows.get(row).map(|r| &r.values[column])
    }

    /// Find the row with exactly this index key
    pub fn find_row(&self, index: &[IndexValue]) -> Option<&Row> {
        self.rows.iter().find(|r| r.index == index)
    }

    /// Distinct values of one level, in order of first appearance
    pub fn level_values(&self, level: usize) -> Vec<IndexValue> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.index.get(level))
            .filter(|v| seen.insert((*v).clone()))
            .cloned()
            .collect()
    }

    /// Append a row after checking its shape against the declared columns
    pub fn push_row(&mut self, index: Vec<IndexValue>, values: Vec<Value>) -> Result<(), EnsembleError> {
        if index.len() != self.index_names.len() {
            return Err(EnsembleError::RowShape(format!(
                "row has {} index values for {} levels",
                index.len(),
                self.index_names.len()
            )));
        }
        if values.len() != self.columns.len() {
            return Err(EnsembleError::RowShape(format!(
                "row has {} values for {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(values.iter()) {
            if !column.kind.accepts(value) {
                return Err(EnsembleError::RowShape(format!(
                    "value {} does not fit {} column {}",
                    value, column.kind, column.label
                )));
            }
        }
        self.rows.push(Row { index, values });
        Ok(())
    }

    /// Append a column computed from each row
    pub fn add_column_with<F>(&mut self, column: Column<K>, mut cell: F) -> Result<(), EnsembleError>
    where
        F: FnMut(&Row) -> Value,
    {
        if self.column_position(&column.label).is_some() {
            return Err(EnsembleError::RowShape(format!("column {} already exists", column.label)));
        }
        let cells: Vec<Value> = self.rows.iter().map(&mut cell).collect();
        if let Some(bad) = cells.iter().find(|v| !column.kind.accepts(v)) {
            return Err(EnsembleError::RowShape(format!(
                "value {} does not fit {} column {}",
                bad, column.kind, column.label
            )));
        }
        for (row, value) in self.rows.iter_mut().zip(cells) {
            row.values.push(value);
        }
        self.columns.push(column);
        Ok(())
    }

    /// Rewrite every value of one index level
    pub fn map_level<F>(&mut self, level: usize, mut f: F) -> Result<(), EnsembleError>
    where
        F: FnMut(&IndexValue) -> Result<IndexValue, EnsembleError>,
    {
        for row in &mut self.rows {
            let slot = row
                .index
                .get_mut(level)
                .ok_or_else(|| EnsembleError::RowShape(format!("row lacks level {}", level)))?;
            *slot = f(slot)?;
        }
        Ok(())
    }

    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(keep);
    }

    pub fn sort_rows_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Row, &Row) -> Ordering,
    {
        self.rows.sort_by(compare);
    }

    /// First pair of rows sharing the full index key
    pub fn duplicate_key(&self) -> Option<&[IndexValue]> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .find(|r| !seen.insert(&r.index))
            .map(|r| r.index.as_slice())
    }

    /// Keep only the listed columns, in the listed order
    pub fn project(&self, labels: &[K]) -> Result<Table<K>, EnsembleError> {
        let positions: Vec<usize> = labels
            .iter()
            .map(|label| {
                self.column_position(label)
                    .ok_or_else(|| EnsembleError::RowShape(format!("no column {}", label)))
            })
            .collect::<Result<_, _>>()?;
        let mut projected = Table::new(
            self.index_names.clone(),
            positions.iter().map(|p| self.columns[*p].clone()).collect(),
        )?;
        projected.rows = self
            .rows
            .iter()
            .map(|row| Row {
                index: row.index.clone(),
                values: positions.iter().map(|p| row.values[*p].clone()).collect(),
            })
            .collect();
        Ok(projected)
    }

    /// Relabel every column, keeping rows untouched
    pub fn relabel<K2, F>(self, mut f: F) -> Result<Table<K2>, EnsembleError>
    where
        K2: ColumnLabel,
        F: FnMut(K) -> K2,
    {
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column::new(f(c.label), c.kind))
            .collect();
        let mut table = Table::new(self.index_names, columns)?;
        table.rows = self.rows;
        Ok(table)
    }

    /// Vertically concatenate tables with the same index levels
    ///
    /// The result has the union of all columns in order of first appearance.
    /// Cells of columns a table does not have are filled according to the
    /// column kind. A column whose cells are all absent takes the kind of the
    /// same column in the other tables.
    ///
    /// # Errors
    /// * `EnsembleError::InvalidIndexShape` - index levels differ
    /// * `EnsembleError::ColumnKindConflict` - one label, two kinds, both with data
    pub fn stack(tables: Vec<Table<K>>) -> Result<Table<K>, EnsembleError> {
        let index_names = match tables.first() {
            Some(first) => first.index_names.clone(),
            None => return Err(EnsembleError::EmptyInput),
        };

        let mut columns: Vec<Column<K>> = Vec::new();
        let mut settled: Vec<bool> = Vec::new();
        let mut positions: HashMap<K, usize> = HashMap::new();
        for table in &tables {
            if table.index_names != index_names {
                return Err(EnsembleError::InvalidIndexShape {
                    expected: index_names,
                    found: table.index_names.clone(),
                });
            }
            for (index, column) in table.columns.iter().enumerate() {
                let has_data = table
                    .rows
                    .iter()
                    .any(|r| r.values.get(index).is_some_and(|v| !v.is_absent()));
                match positions.get(&column.label) {
                    Some(&p) if columns[p].kind != column.kind && has_data => {
                        if settled[p] {
                            return Err(EnsembleError::ColumnKindConflict {
                                column: column.label.to_string(),
                                left: columns[p].kind.to_string(),
                                right: column.kind.to_string(),
                            });
                        }
                        columns[p].kind = column.kind;
                        settled[p] = true;
                    }
                    Some(&p) => settled[p] |= has_data,
                    None => {
                        positions.insert(column.label.clone(), columns.len());
                        columns.push(column.clone());
                        settled.push(has_data);
                    }
                }
            }
        }

        let mut stacked = Table::new(index_names, columns)?;
        for table in tables {
            let targets: Vec<usize> = table.columns.iter().map(|c| positions[&c.label]).collect();
            for row in table.rows {
                let mut values: Vec<Value> = stacked.columns.iter().map(|c| c.kind.missing()).collect();
                for (target, value) in targets.iter().zip(row.values) {
                    let kind = stacked.columns[*target].kind;
                    values[*target] = if value.is_absent() && !kind.accepts(&value) { kind.missing() } else { value };
                }
                stacked.rows.push(Row {
                    index: row.index,
                    values,
                });
            }
        }
        Ok(stacked)
    }

    #[cfg(test)]
    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    /// Check every row against the declared shape
    pub fn check_shape(&self) -> Result<(), EnsembleError> {
        for row in &self.rows {
            if row.index.len() != self.index_names.len() || row.values.len() != self.columns.len() {
                return Err(EnsembleError::RowShape(format!(
                    "row {:?} does not match {} levels and {} columns",
                    row.index,
                    self.index_names.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurements(profile: &str, columns: &[&str], rows: Vec<(i64, Vec<f64>)>) -> SingleIndexedTable {
        let mut table = Table::new(
            vec!["node".to_string(), "profile".to_string()],
            columns
                .iter()
                .map(|c| Column::new(c.to_string(), ColumnKind::Numeric))
                .collect(),
        )
        .unwrap();
        for (node, values) in rows {
            table
                .push_row(
                    vec![IndexValue::Int(node), IndexValue::text(profile)],
                    values.into_iter().map(Value::Number).collect(),
                )
                .unwrap();
        }
        table
    }

    #[test]
    fn test_push_row_checks_kind() {
        let mut table = measurements("p", &["time"], vec![]);
        let err = table
            .push_row(vec![IndexValue::Int(0), IndexValue::text("p")], vec![Value::text("x")])
            .unwrap_err();
        assert!(matches!(err, EnsembleError::RowShape(_)));
    }

    #[test]
    fn test_stack_unions_columns() {
        let left = measurements("a", &["time"], vec![(0, vec![1.0])]);
        let right = measurements("b", &["time", "bytes"], vec![(0, vec![2.0, 64.0])]);
        let stacked = Table::stack(vec![left, right]).unwrap();

        assert_eq!(stacked.columns().len(), 2);
        assert_eq!(stacked.len(), 2);
        assert_eq!(stacked.get(0, &"bytes".to_string()), Some(&Value::Missing));
        assert_eq!(stacked.get(1, &"bytes".to_string()), Some(&Value::Number(64.0)));
    }

    #[test]
    fn test_stack_rejects_kind_conflict() {
        let left = measurements("a", &["time"], vec![(0, vec![1.0])]);
        let mut right = Table::new(
            vec!["node".to_string(), "profile".to_string()],
            vec![Column::new("time".to_string(), ColumnKind::Text)],
        )
        .unwrap();
        right
            .push_row(vec![IndexValue::Int(0), IndexValue::text("b")], vec![Value::text("slow")])
            .unwrap();
        assert!(matches!(
            Table::stack(vec![left, right]),
            Err(EnsembleError::ColumnKindConflict { .. })
        ));
    }

    #[test]
    fn test_stack_absent_column_takes_other_kind() {
        let mut absent = Table::new(
            vec!["node".to_string(), "profile".to_string()],
            vec![Column::new("ranks".to_string(), ColumnKind::Text)],
        )
        .unwrap();
        absent
            .push_row(vec![IndexValue::Int(0), IndexValue::text("a")], vec![Value::Null])
            .unwrap();
        let measured = measurements("b", &["ranks"], vec![(0, vec![4.0])]);

        for tables in [vec![absent.clone(), measured.clone()], vec![measured, absent]] {
            let stacked = Table::stack(tables).unwrap();
            assert_eq!(stacked.columns()[0].kind, ColumnKind::Numeric);
            assert!(stacked.check_shape().is_ok());
            let ranks: Vec<&Value> = stacked.rows().iter().map(|r| &r.values[0]).collect();
            assert!(ranks.contains(&&Value::Null));
            assert!(ranks.contains(&&Value::Number(4.0)));
        }
    }

    #[test]
    fn test_stack_missing_cells_follow_text_kind() {
        let empty = measurements("a", &["label"], vec![]);
        let mut absent = measurements("b", &["label"], vec![]);
        absent
            .push_row(vec![IndexValue::Int(0), IndexValue::text("b")], vec![Value::Missing])
            .unwrap();
        let mut labeled = Table::new(
            vec!["node".to_string(), "profile".to_string()],
            vec![Column::new("label".to_string(), ColumnKind::Text)],
        )
        .unwrap();
        labeled
            .push_row(vec![IndexValue::Int(0), IndexValue::text("c")], vec![Value::text("hot")])
            .unwrap();

        let stacked = Table::stack(vec![empty, absent, labeled]).unwrap();
        assert_eq!(stacked.columns()[0].kind, ColumnKind::Text);
        assert_eq!(stacked.get(0, &"label".to_string()), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_key() {
        let table = measurements("a", &["time"], vec![(0, vec![1.0]), (1, vec![1.0]), (0, vec![3.0])]);
        assert_eq!(
            table.duplicate_key(),
            Some(&[IndexValue::Int(0), IndexValue::text("a")][..])
        );
    }

    #[test]
    fn test_level_values_first_appearance() {
        let table = measurements("a", &["time"], vec![(3, vec![1.0]), (1, vec![1.0]), (3, vec![2.0])]);
        assert_eq!(table.level_values(0), vec![IndexValue::Int(3), IndexValue::Int(1)]);
    }

    #[test]
    fn test_project_and_relabel() {
        let table = measurements("a", &["time", "bytes"], vec![(0, vec![1.0, 8.0])]);
        let projected = table.project(&["bytes".to_string()]).unwrap();
        assert_eq!(projected.columns().len(), 1);

        let joined = projected.relabel(|name| JoinedColumn::under("H", name)).unwrap();
        assert_eq!(joined.columns()[0].label, JoinedColumn::under("H", "bytes"));
        assert_eq!(joined.get(0, &JoinedColumn::under("H", "bytes")), Some(&Value::Number(8.0)));
    }

    #[test]
    fn test_level_lookup() {
        let table = measurements("a", &["time"], vec![]);
        assert_eq!(table.level("profile").unwrap(), 1);
        assert_eq!(
            table.level("rank").unwrap_err(),
            EnsembleError::MissingIndexLevel("rank".to_string())
        );
    }
}
