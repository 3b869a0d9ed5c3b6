//! The two change representations and the keyed upsert shared by the queue
//! and the patch ledger.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff_entry::DiffEntry;
use crate::path::entity_file_name;

/// What a published change did to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Edit,
    Delete,
}

impl ChangeType {
    /// Classify a change from whether the previous and next values exist.
    ///
    /// A missing next value is always a delete.
    pub fn from_presence(old_present: bool, new_present: bool) -> Self {
        match (old_present, new_present) {
            (_, false) => Self::Delete,
            (false, true) => Self::Add,
            (true, true) => Self::Edit,
        }
    }

    /// The change type that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::Add => Self::Delete,
            Self::Delete => Self::Add,
            Self::Edit => Self::Edit,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Identity of a change target: at most one pending change and at most one
/// change per patch exists for each key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeKey {
    /// Normalised entity file name (`*.json`).
    pub target: String,
    pub field: String,
}

impl ChangeKey {
    pub fn new(target_id: &str, field: &str) -> Self {
        Self {
            target: entity_file_name(target_id),
            field: field.to_string(),
        }
    }
}

/// Anything that can be merged by [`ChangeKey`].
pub trait Keyed {
    fn key(&self) -> ChangeKey;
}

/// Insert `item` or merge it into the existing element with the same key.
///
/// When an element with the same key exists, `merge(existing, item)` is
/// called and `true` is returned; otherwise `item` is appended.
pub fn upsert_by_key<T, F>(items: &mut Vec<T>, item: T, merge: F) -> bool
where
    T: Keyed,
    F: FnOnce(&mut T, T),
{
    let key = item.key();
    match items.iter_mut().find(|existing| existing.key() == key) {
        Some(existing) => {
            merge(existing, item);
            true
        }
        None => {
            items.push(item);
            false
        }
    }
}

/// A published change: the edit reduced to a structural diff.
///
/// `change_type` is fixed when the change is built and never recomputed.
/// For whole-document `add` / `delete` changes `diffs` is empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlimChange {
    pub target_id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub field: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub diffs: Vec<DiffEntry>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl SlimChange {
    pub fn new(
        target_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        field: impl Into<String>,
        change_type: ChangeType,
        diffs: Vec<DiffEntry>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            name: name.into(),
            category: category.into(),
            field: field.into(),
            change_type,
            diffs,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

impl Keyed for SlimChange {
    fn key(&self) -> ChangeKey {
        ChangeKey::new(&self.target_id, &self.field)
    }
}

/// A pending edit: full copies of the value before and after.
///
/// Snapshot changes only live in the queue (and in legacy patches written
/// before slim diffs existed). `old` is absent for a queued create, `new` is
/// absent for a queued delete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotChange {
    pub target_id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl SnapshotChange {
    pub fn new(
        target_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        field: impl Into<String>,
        old: Option<Value>,
        new: Option<Value>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            name: name.into(),
            category: category.into(),
            field: field.into(),
            old,
            new,
            timestamp: Utc::now(),
        }
    }

    /// Fold a later edit of the same target into this one.
    ///
    /// The original `old` is kept; `new` and `timestamp` come from `later`.
    pub fn merge_later(&mut self, later: SnapshotChange) {
        self.new = later.new;
        self.timestamp = later.timestamp;
    }

    /// The same change with `old` and `new` exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            old: self.new.clone(),
            new: self.old.clone(),
            ..self.clone()
        }
    }
}

impl Keyed for SnapshotChange {
    fn key(&self) -> ChangeKey {
        ChangeKey::new(&self.target_id, &self.field)
    }
}

/// A change as stored inside a patch.
///
/// Current patches hold [`SlimChange`]s; patches written before slim diffs
/// existed hold snapshot-shaped entries, which are still read, displayed and
/// rolled back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Change {
    Slim(SlimChange),
    Snapshot(SnapshotChange),
}

impl Change {
    pub fn target_id(&self) -> &str {
        match self {
            Self::Slim(c) => &c.target_id,
            Self::Snapshot(c) => &c.target_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Slim(c) => &c.name,
            Self::Snapshot(c) => &c.name,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Self::Slim(c) => &c.category,
            Self::Snapshot(c) => &c.category,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Slim(c) => &c.field,
            Self::Snapshot(c) => &c.field,
        }
    }

    /// Returns `true` for legacy snapshot-shaped entries.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    pub fn as_slim(&self) -> Option<&SlimChange> {
        match self {
            Self::Slim(c) => Some(c),
            Self::Snapshot(_) => None,
        }
    }
}

impl Keyed for Change {
    fn key(&self) -> ChangeKey {
        ChangeKey::new(self.target_id(), self.field())
    }
}

impl From<SlimChange> for Change {
    fn from(change: SlimChange) -> Self {
        Self::Slim(change)
    }
}

impl From<SnapshotChange> for Change {
    fn from(change: SnapshotChange) -> Self {
        Self::Snapshot(change)
    }
}
