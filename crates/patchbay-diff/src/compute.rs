//! Forward diffing: (old, new) document pair to typed path operations.

use serde_json::{Map, Value};

use patchbay_types::{
    field_path, is_root_field, ArrayItem, ChangeType, DiffEntry, PathStep, SlimChange,
    SnapshotChange,
};

use crate::error::DiffResult;

/// Change type and diff entries for one (old, new) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedDiff {
    pub change_type: ChangeType,
    pub diffs: Vec<DiffEntry>,
}

/// Classify and diff two whole documents.
///
/// - `old` absent, `new` present: `add` with no entries (write whole document).
/// - `new` absent: `delete` with no entries (remove whole document).
/// - both present: `edit` with the structural diff.
pub fn compute(old: Option<&Value>, new: Option<&Value>) -> ComputedDiff {
    let change_type = ChangeType::from_presence(old.is_some(), new.is_some());
    let diffs = match (old, new) {
        (Some(old), Some(new)) => diff_values(old, new),
        _ => Vec::new(),
    };
    ComputedDiff { change_type, diffs }
}

/// Structural diff of two present values, rooted at the empty path.
pub fn diff_values(old: &Value, new: &Value) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    recursive_diff(&[], old, new, &mut out);
    out
}

/// Append the entries turning `old` into `new` at `path` to `out`.
///
/// Object keys are visited in map order: additions, then deletions, then
/// shared keys. Arrays are compared by position: differing shared slots
/// become whole-element edits, trailing additions are emitted in ascending
/// index order and trailing removals in descending order, so the list
/// applies front to back.
pub fn recursive_diff(path: &[PathStep], old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => diff_objects(path, old_map, new_map, out),
        (Value::Array(old_items), Value::Array(new_items)) => {
            diff_arrays(path, old_items, new_items, out)
        }
        _ => out.push(DiffEntry::Edited {
            path: path.to_vec(),
            lhs: old.clone(),
            rhs: new.clone(),
        }),
    }
}

fn child(path: &[PathStep], key: &str) -> Vec<PathStep> {
    let mut p = path.to_vec();
    p.push(PathStep::Key(key.to_string()));
    p
}

fn diff_objects(
    path: &[PathStep],
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    out: &mut Vec<DiffEntry>,
) {
    for (key, value) in new {
        if !old.contains_key(key) {
            out.push(DiffEntry::NewKey {
                path: child(path, key),
                rhs: value.clone(),
            });
        }
    }
    for (key, value) in old {
        if !new.contains_key(key) {
            out.push(DiffEntry::DeletedKey {
                path: child(path, key),
                lhs: value.clone(),
            });
        }
    }
    for (key, old_value) in old {
        if let Some(new_value) = new.get(key) {
            recursive_diff(&child(path, key), old_value, new_value, out);
        }
    }
}

fn diff_arrays(path: &[PathStep], old: &[Value], new: &[Value], out: &mut Vec<DiffEntry>) {
    let shared = old.len().min(new.len());
    for index in 0..shared {
        if old[index] != new[index] {
            out.push(DiffEntry::ArrayElement {
                path: path.to_vec(),
                index,
                item: ArrayItem::Edited {
                    lhs: old[index].clone(),
                    rhs: new[index].clone(),
                },
            });
        }
    }
    for (index, value) in new.iter().enumerate().skip(shared) {
        out.push(DiffEntry::ArrayElement {
            path: path.to_vec(),
            index,
            item: ArrayItem::NewKey { rhs: value.clone() },
        });
    }
    for (index, value) in old.iter().enumerate().skip(shared).rev() {
        out.push(DiffEntry::ArrayElement {
            path: path.to_vec(),
            index,
            item: ArrayItem::DeletedKey { lhs: value.clone() },
        });
    }
}

/// Reduce a queued snapshot change to its published slim form.
///
/// For the root field this is [`compute`] over the whole documents. For any
/// other field `old` / `new` are values of that field, and every entry is
/// rooted at the field's path inside the document; a created or removed
/// field becomes a single `NewKey` / `DeletedKey` entry at that path.
pub fn slim(change: &SnapshotChange) -> DiffResult<SlimChange> {
    let old = change.old.as_ref();
    let new = change.new.as_ref();

    let computed = if is_root_field(&change.field) {
        compute(old, new)
    } else {
        let prefix = field_path(&change.field)?;
        let change_type = ChangeType::from_presence(old.is_some(), new.is_some());
        let mut diffs = Vec::new();
        match (old, new) {
            (Some(old), Some(new)) => recursive_diff(&prefix, old, new, &mut diffs),
            (None, Some(new)) => diffs.push(DiffEntry::NewKey {
                path: prefix,
                rhs: new.clone(),
            }),
            (Some(old), None) => diffs.push(DiffEntry::DeletedKey {
                path: prefix,
                lhs: old.clone(),
            }),
            (None, None) => {}
        }
        ComputedDiff { change_type, diffs }
    };

    Ok(SlimChange::new(
        change.target_id.clone(),
        change.name.clone(),
        change.category.clone(),
        change.field.clone(),
        computed.change_type,
        computed.diffs,
    ))
}
