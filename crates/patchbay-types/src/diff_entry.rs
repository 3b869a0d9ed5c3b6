//! Typed path operations making up a slim diff.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::PathStep;

/// A single structural difference between two document values.
///
/// `lhs` is always the previous value and `rhs` the next one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DiffEntry {
    /// A value changed in place.
    Edited {
        path: Vec<PathStep>,
        lhs: Value,
        rhs: Value,
    },
    /// A key exists only in the next document.
    NewKey { path: Vec<PathStep>, rhs: Value },
    /// A key exists only in the previous document.
    DeletedKey { path: Vec<PathStep>, lhs: Value },
    /// Something happened at one slot of the array located at `path`.
    ArrayElement {
        path: Vec<PathStep>,
        index: usize,
        item: ArrayItem,
    },
}

/// What happened at one array slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ArrayItem {
    /// The slot's element was replaced as a whole.
    Edited { lhs: Value, rhs: Value },
    /// An element was appended at the slot.
    NewKey { rhs: Value },
    /// The element at the slot was removed.
    DeletedKey { lhs: Value },
}

impl DiffEntry {
    /// The location this entry operates on.
    pub fn path(&self) -> &[PathStep] {
        match self {
            Self::Edited { path, .. }
            | Self::NewKey { path, .. }
            | Self::DeletedKey { path, .. }
            | Self::ArrayElement { path, .. } => path,
        }
    }

    /// Short kind label used in logs and CLI output.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Edited { .. } => "Edited",
            Self::NewKey { .. } => "NewKey",
            Self::DeletedKey { .. } => "DeletedKey",
            Self::ArrayElement { .. } => "ArrayElement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edited_wire_format() {
        let entry = DiffEntry::Edited {
            path: vec!["hp".into()],
            lhs: json!(10),
            rhs: json!(20),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"kind": "Edited", "path": ["hp"], "lhs": 10, "rhs": 20})
        );
    }

    #[test]
    fn array_element_wire_format() {
        let entry = DiffEntry::ArrayElement {
            path: vec!["drops".into()],
            index: 3,
            item: ArrayItem::NewKey { rhs: json!("gem") },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "ArrayElement",
                "path": ["drops"],
                "index": 3,
                "item": {"kind": "NewKey", "rhs": "gem"}
            })
        );
        let back: DiffEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
