//! Cell and index values.

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One measurement or metadata cell
///
/// `Missing` is the numeric missing-value sentinel; `Null` is the explicit
/// null marker used for text columns. Which one a filled cell gets is decided
/// by the column's declared [`ColumnKind`], never by inspecting values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
    Null,
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Missing | Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to an index value, if the cell can serve as a row key
    ///
    /// Integral finite numbers become `Int`, text stays text; anything else
    /// (fractions, absent cells) is not a usable key.
    pub fn to_index(&self) -> Option<IndexValue> {
        match self {
            Value::Number(x) if x.is_finite() && x.fract() == 0.0 => Some(IndexValue::Int(*x as i64)),
            Value::Text(s) => Some(IndexValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => write!(f, "NaN"),
            Value::Null => write!(f, "null"),
        }
    }
}

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    /// Placeholder for a cell that has no data
    pub fn missing(self) -> Value {
        match self {
            ColumnKind::Numeric => Value::Missing,
            ColumnKind::Text => Value::Null,
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnKind::Numeric, Value::Number(_) | Value::Missing) => true,
            (ColumnKind::Text, Value::Text(_)) => true,
            _ => false,
        }
    }

    /// Kind that naturally holds `value`
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Text(_) | Value::Null => ColumnKind::Text,
            Value::Number(_) | Value::Missing => ColumnKind::Numeric,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// One level of a row key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexValue {
    Node(NodeId),
    Int(i64),
    Text(String),
}

/// Profile identifiers are plain index values (never `Node`)
pub type ProfileId = IndexValue;

impl IndexValue {
    pub fn text(value: impl Into<String>) -> Self {
        IndexValue::Text(value.into())
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            IndexValue::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Back to a cell value, for metadata columns that record keys
    pub fn to_value(&self) -> Value {
        match self {
            IndexValue::Node(id) => Value::Text(id.to_string()),
            IndexValue::Int(i) => Value::Number(*i as f64),
            IndexValue::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }
}

impl From<NodeId> for IndexValue {
    fn from(value: NodeId) -> Self {
        IndexValue::Node(value)
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Node(id) => write!(f, "{}", id),
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Text(s) => write!(f, "{}", s),
        }
    }
}
