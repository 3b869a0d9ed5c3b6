//! Reading and writing a single field of a document by its dotted path.

use serde_json::Value;

use patchbay_types::{field_path, DiffEntry, PathStep};

use crate::apply::{apply_change, ApplyOutcome};
use crate::error::DiffResult;

/// The value at `field`, or `None` if any step is missing.
///
/// The root field addresses `doc` itself.
pub fn field_value<'a>(doc: &'a Value, field: &str) -> DiffResult<Option<&'a Value>> {
    let path = field_path(field)?;
    let mut current = doc;
    for step in &path {
        let next = match (current, step) {
            (Value::Object(map), PathStep::Key(k)) => map.get(k),
            (Value::Object(map), PathStep::Index(i)) => map.get(&i.to_string()),
            (Value::Array(items), PathStep::Index(i)) => items.get(*i),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Set the value at `field`, or remove it when `value` is `None`.
///
/// Writing goes through [`apply_change`], so reserved keys are refused and
/// missing containers are created. Removing the root field is unresolved:
/// deleting a whole document is a file operation.
pub fn write_field(doc: &mut Value, field: &str, value: Option<Value>) -> DiffResult<ApplyOutcome> {
    let path = field_path(field)?;
    let entry = match value {
        Some(rhs) => DiffEntry::Edited {
            path,
            lhs: Value::Null,
            rhs,
        },
        None => DiffEntry::DeletedKey {
            path,
            lhs: Value::Null,
        },
    };
    Ok(apply_change(doc, &entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_and_indexed_fields() {
        let doc = json!({"stats": {"hp": 10}, "drops": ["a", "b"]});
        assert_eq!(field_value(&doc, "stats.hp").unwrap(), Some(&json!(10)));
        assert_eq!(field_value(&doc, "drops.1").unwrap(), Some(&json!("b")));
        assert_eq!(field_value(&doc, "stats.mp").unwrap(), None);
        assert_eq!(field_value(&doc, "entity").unwrap(), Some(&doc));
    }

    #[test]
    fn writes_and_removes_fields() {
        let mut doc = json!({"stats": {"hp": 10}});
        assert_eq!(
            write_field(&mut doc, "stats.mp", Some(json!(3))).unwrap(),
            ApplyOutcome::Applied
        );
        write_field(&mut doc, "stats.hp", None).unwrap();
        assert_eq!(doc, json!({"stats": {"mp": 3}}));
    }

    #[test]
    fn root_write_replaces_document() {
        let mut doc = json!({"hp": 1});
        write_field(&mut doc, "entity", Some(json!({"hp": 2}))).unwrap();
        assert_eq!(doc, json!({"hp": 2}));
        assert_eq!(
            write_field(&mut doc, "entity", None).unwrap(),
            ApplyOutcome::Unresolved
        );
    }

    #[test]
    fn reserved_key_refused() {
        let mut doc = json!({});
        assert_eq!(
            write_field(&mut doc, "__proto__.polluted", Some(json!(true))).unwrap(),
            ApplyOutcome::Blocked
        );
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn bad_field_is_error() {
        assert!(write_field(&mut json!({}), "a..b", None).is_err());
    }
}
