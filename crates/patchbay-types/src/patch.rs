//! Published patches.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::{upsert_by_key, Change};
use crate::error::TypeError;

/// Release classification of a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchType {
    Patch,
    Hotfix,
    Content,
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Hotfix => write!(f, "hotfix"),
            Self::Content => write!(f, "content"),
        }
    }
}

impl FromStr for PatchType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "hotfix" => Ok(Self::Hotfix),
            "content" => Ok(Self::Content),
            other => Err(TypeError::Serialization(format!("unknown patch type: {other}"))),
        }
    }
}

/// An immutable, published bundle of changes tied to a version string.
///
/// Within one patch there is at most one change per (target, field).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub id: String,
    pub version: String,
    #[serde(rename = "type")]
    pub patch_type: PatchType,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
    /// Source-control diff text captured when the patch was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl Patch {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        patch_type: PatchType,
        title: impl Into<String>,
        tags: BTreeSet<String>,
        changes: Vec<Change>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            patch_type,
            title: title.into(),
            date: Utc::now(),
            tags,
            changes,
            diff: None,
        }
    }

    /// Insert a change, replacing any existing change with the same key.
    pub fn upsert_change(&mut self, change: Change) -> bool {
        upsert_by_key(&mut self.changes, change, |existing, latest| *existing = latest)
    }

    /// Version string used by the patch that reverts this one.
    pub fn revert_version(&self) -> String {
        format!("{}-revert", self.version)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
