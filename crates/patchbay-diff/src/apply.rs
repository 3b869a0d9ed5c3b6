//! Backward direction: inverting diff entries and applying them to a
//! document.
//!
//! Application is best-effort. An entry whose path cannot be resolved is
//! skipped with a warning instead of failing, so that a rollback never stops
//! half-way because one entry no longer matches the document. Entries that
//! touch a reserved key are refused outright.

use serde_json::{Map, Value};
use tracing::warn;

use patchbay_types::{format_path, ArrayItem, DiffEntry, PathStep};

/// Keys that are never written through a diff path.
pub const BLOCKED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Returns `true` if `key` is on the reserved-key deny-list.
pub fn is_blocked_key(key: &str) -> bool {
    BLOCKED_KEYS.contains(&key)
}

/// What happened when one entry was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document was updated.
    Applied,
    /// The path touched a reserved key; the document is untouched.
    Blocked,
    /// The path could not be resolved; the document is untouched.
    Unresolved,
}

/// Tally of outcomes from [`apply_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub blocked: usize,
    pub unresolved: usize,
}

impl ApplyReport {
    /// Returns `true` if every entry was applied.
    pub fn is_clean(&self) -> bool {
        self.blocked == 0 && self.unresolved == 0
    }

    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Blocked => self.blocked += 1,
            ApplyOutcome::Unresolved => self.unresolved += 1,
        }
    }
}

/// The entry that undoes `entry`: `lhs` and `rhs` swap, `NewKey` and
/// `DeletedKey` swap.
pub fn invert(entry: &DiffEntry) -> DiffEntry {
    match entry {
        DiffEntry::Edited { path, lhs, rhs } => DiffEntry::Edited {
            path: path.clone(),
            lhs: rhs.clone(),
            rhs: lhs.clone(),
        },
        DiffEntry::NewKey { path, rhs } => DiffEntry::DeletedKey {
            path: path.clone(),
            lhs: rhs.clone(),
        },
        DiffEntry::DeletedKey { path, lhs } => DiffEntry::NewKey {
            path: path.clone(),
            rhs: lhs.clone(),
        },
        DiffEntry::ArrayElement { path, index, item } => DiffEntry::ArrayElement {
            path: path.clone(),
            index: *index,
            item: invert_item(item),
        },
    }
}

fn invert_item(item: &ArrayItem) -> ArrayItem {
    match item {
        ArrayItem::Edited { lhs, rhs } => ArrayItem::Edited {
            lhs: rhs.clone(),
            rhs: lhs.clone(),
        },
        ArrayItem::NewKey { rhs } => ArrayItem::DeletedKey { lhs: rhs.clone() },
        ArrayItem::DeletedKey { lhs } => ArrayItem::NewKey { rhs: lhs.clone() },
    }
}

/// Invert a whole diff: every entry inverted, in reverse order.
///
/// `apply_all(new, &invert_all(diffs))` restores the document the diffs
/// were computed from.
pub fn invert_all(diffs: &[DiffEntry]) -> Vec<DiffEntry> {
    diffs.iter().rev().map(invert).collect()
}

/// Undo a single entry on `doc`.
pub fn revert_change(doc: &mut Value, entry: &DiffEntry) -> ApplyOutcome {
    apply_change(doc, &invert(entry))
}

/// Apply every entry in order, tallying the outcomes.
pub fn apply_all(doc: &mut Value, entries: &[DiffEntry]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for entry in entries {
        report.record(apply_change(doc, entry));
    }
    report
}

/// Apply one entry to `doc` in the forward direction.
///
/// - `Edited` / `NewKey` set the final step to `rhs`, creating missing
///   intermediate containers (an array when the following step is an index,
///   otherwise an object). An empty path replaces the whole document.
/// - `DeletedKey` removes the final step.
/// - `ArrayElement` inserts (`NewKey`), removes (`DeletedKey`) or replaces
///   (`Edited`) the element at `index` of the array at `path`.
pub fn apply_change(doc: &mut Value, entry: &DiffEntry) -> ApplyOutcome {
    let path = entry.path();
    if let Some(key) = path.iter().find_map(|s| s.as_key().filter(|k| is_blocked_key(k))) {
        warn!(
            path = %format_path(path),
            key,
            "blocked diff entry targeting a reserved key"
        );
        return ApplyOutcome::Blocked;
    }

    // Containers are created on the way down before the leaf is known to
    // apply, so a failed entry restores the original document.
    let original = doc.clone();
    let applied = match entry {
        DiffEntry::Edited { path, rhs, .. } | DiffEntry::NewKey { path, rhs } => {
            set_path(doc, path, rhs.clone())
        }
        DiffEntry::DeletedKey { path, .. } => remove_path(doc, path),
        DiffEntry::ArrayElement { path, index, item } => {
            apply_array_item(doc, path, *index, item)
        }
    };

    if applied {
        ApplyOutcome::Applied
    } else {
        *doc = original;
        warn!(
            path = %format_path(path),
            kind = entry.kind_label(),
            "diff entry does not match the document; skipping"
        );
        ApplyOutcome::Unresolved
    }
}

fn set_path(doc: &mut Value, path: &[PathStep], value: Value) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        *doc = value;
        return true;
    };
    match navigate(doc, parents, leaf.is_index()) {
        Some(parent) => set_child(parent, leaf, value),
        None => false,
    }
}

fn remove_path(doc: &mut Value, path: &[PathStep]) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };
    match lookup_mut(doc, parents) {
        Some(Value::Object(map)) => {
            map.remove(&step_key(leaf));
            true
        }
        Some(Value::Array(items)) => match step_index(leaf) {
            Some(i) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn apply_array_item(doc: &mut Value, path: &[PathStep], index: usize, item: &ArrayItem) -> bool {
    let Some(Value::Array(items)) = navigate(doc, path, true) else {
        return false;
    };
    match item {
        ArrayItem::NewKey { rhs } if index <= items.len() => {
            items.insert(index, rhs.clone());
            true
        }
        ArrayItem::DeletedKey { .. } if index < items.len() => {
            items.remove(index);
            true
        }
        ArrayItem::Edited { rhs, .. } if index < items.len() => {
            items[index] = rhs.clone();
            true
        }
        ArrayItem::Edited { rhs, .. } if index == items.len() => {
            items.push(rhs.clone());
            true
        }
        _ => false,
    }
}

/// Walk `steps`, creating missing (or null) containers on the way.
///
/// `leaf_is_index` picks the kind of container created for the last step.
fn navigate<'a>(doc: &'a mut Value, steps: &[PathStep], leaf_is_index: bool) -> Option<&'a mut Value> {
    let mut current = doc;
    for (i, step) in steps.iter().enumerate() {
        let next_is_index = steps
            .get(i + 1)
            .map(PathStep::is_index)
            .unwrap_or(leaf_is_index);
        current = child_or_create(current, step, next_is_index)?;
    }
    Some(current)
}

fn empty_container(array: bool) -> Value {
    if array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn child_or_create<'a>(parent: &'a mut Value, step: &PathStep, array: bool) -> Option<&'a mut Value> {
    let slot = match parent {
        Value::Object(map) => map.entry(step_key(step)).or_insert(Value::Null),
        Value::Array(items) => {
            let i = step_index(step)?;
            if i == items.len() {
                items.push(Value::Null);
            }
            items.get_mut(i)?
        }
        _ => return None,
    };
    if slot.is_null() {
        *slot = empty_container(array);
    }
    Some(slot)
}

/// Walk `steps` without creating anything.
fn lookup_mut<'a>(doc: &'a mut Value, steps: &[PathStep]) -> Option<&'a mut Value> {
    let mut current = doc;
    for step in steps {
        current = match current {
            Value::Object(map) => map.get_mut(&step_key(step))?,
            Value::Array(items) => items.get_mut(step_index(step)?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_child(parent: &mut Value, step: &PathStep, value: Value) -> bool {
    match parent {
        Value::Object(map) => {
            map.insert(step_key(step), value);
            true
        }
        Value::Array(items) => match step_index(step) {
            Some(i) if i < items.len() => {
                items[i] = value;
                true
            }
            Some(i) if i == items.len() => {
                items.push(value);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn step_key(step: &PathStep) -> String {
    match step {
        PathStep::Key(k) => k.clone(),
        PathStep::Index(i) => i.to_string(),
    }
}

fn step_index(step: &PathStep) -> Option<usize> {
    match step {
        PathStep::Index(i) => Some(*i),
        PathStep::Key(k) => k.parse().ok(),
    }
}
