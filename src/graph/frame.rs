//! Structural frames of call-path nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute that every frame carries
pub const FRAME_NAME: &str = "name";

/// Ordered attribute set describing one call-stack position
///
/// Two nodes under the same parent are the same node when their frames are
/// equal. A frame that shares a `name` with another at one position but
/// differs elsewhere is a distinct sibling when one graph carries both, and a
/// structural mismatch when it stands in for the other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frame {
    attrs: BTreeMap<String, String>,
}

impl Frame {
    /// Create a frame with only a name
    pub fn new(name: impl Into<String>) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert(FRAME_NAME.to_string(), name.into());
        Self { attrs }
    }

    /// Add or replace an attribute
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != FRAME_NAME {
            self.attrs.insert(key, value.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        self.attrs.get(FRAME_NAME).map(String::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Frames that could stand for the same call-stack position
    pub fn same_position(&self, other: &Frame) -> bool {
        self.name() == other.name()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.attrs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_cannot_be_overwritten() {
        let frame = Frame::new("main").with("name", "other").with("type", "function");
        assert_eq!(frame.name(), "main");
        assert_eq!(frame.get("type"), Some("function"));
    }

    #[test]
    fn test_display_is_ordered() {
        let frame = Frame::new("foo").with("type", "loop");
        assert_eq!(frame.to_string(), "{name: foo, type: loop}");
    }

    #[test]
    fn test_same_position() {
        let a = Frame::new("foo").with("type", "function");
        let b = Frame::new("foo").with("type", "loop");
        assert!(a.same_position(&b));
        assert_ne!(a, b);
    }
}
