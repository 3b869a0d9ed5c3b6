//! The published patch list.
//!
//! Patches live in one JSON document, newest first. A patch is never
//! removed or rewritten except when a later commit under the same version
//! merges into it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use patchbay_diff::slim;
use patchbay_gate::{Candidate, ChangeGate};
use patchbay_queue::ChangeQueue;
use patchbay_store::{read_optional, write_typed, BackupStore, FileStore};
use patchbay_types::{entity_file_name, Change, Patch, PatchType, SlimChange};

use crate::error::{LedgerError, LedgerResult};

/// Title, version, type and tags of a patch about to be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchMeta {
    pub title: String,
    pub version: String,
    pub patch_type: PatchType,
    pub tags: BTreeSet<String>,
}

impl PatchMeta {
    pub fn new(title: impl Into<String>, version: impl Into<String>, patch_type: PatchType) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            patch_type,
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

/// Result of [`PatchLedger::commit`].
#[derive(Clone, Debug)]
pub struct CommitOutcome {
    pub patch: Patch,
    /// `true` when the changes were merged into an existing patch with the
    /// same version.
    pub merged: bool,
    /// Entity files covered by the committed changes.
    pub touched: Vec<PathBuf>,
}

/// Result of [`PatchLedger::rollback`].
#[derive(Clone, Debug)]
pub struct RollbackOutcome {
    /// The newly recorded revert patch.
    pub patch: Patch,
    /// Entity files written or deleted.
    pub touched: Vec<PathBuf>,
    /// Changes skipped because their entity could not be found.
    pub skipped: usize,
}

/// The list of published patches, persisted at `<data_dir>/<patches_file>`.
pub struct PatchLedger {
    pub(crate) store: Arc<dyn FileStore>,
    gate: Arc<ChangeGate>,
    pub(crate) data_dir: PathBuf,
    patches_path: PathBuf,
}

impl std::fmt::Debug for PatchLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchLedger")
            .field("data_dir", &self.data_dir)
            .field("patches_path", &self.patches_path)
            .finish()
    }
}

impl PatchLedger {
    pub fn new(
        store: Arc<dyn FileStore>,
        gate: Arc<ChangeGate>,
        data_dir: impl Into<PathBuf>,
        patches_file: &str,
    ) -> Self {
        let data_dir = data_dir.into();
        let patches_path = data_dir.join(patches_file);
        Self {
            store,
            gate,
            data_dir,
            patches_path,
        }
    }

    /// Location of the patch document.
    pub fn path(&self) -> &Path {
        &self.patches_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn entity_path(&self, category: &str, target_id: &str) -> PathBuf {
        self.data_dir.join(category).join(entity_file_name(target_id))
    }

    /// Every published patch, newest first.
    pub fn patches(&self) -> LedgerResult<Vec<Patch>> {
        Ok(read_optional(self.store.as_ref(), &self.patches_path)?.unwrap_or_default())
    }

    /// The patch with the given id.
    pub fn get(&self, id: &str) -> LedgerResult<Patch> {
        self.patches()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::PatchNotFound(id.to_string()))
    }

    /// Validate `changes` and publish them as a new patch.
    pub fn record_patch(&self, meta: PatchMeta, changes: Vec<SlimChange>) -> LedgerResult<Patch> {
        self.gate
            .check_all("changes", changes.iter().map(Candidate::Slim))?;

        let mut patches = self.patches()?;
        let patch = Patch::new(
            next_id("patch_", &patches),
            meta.version,
            meta.patch_type,
            meta.title,
            meta.tags,
            changes.into_iter().map(Change::from).collect(),
        );
        patches.insert(0, patch.clone());
        self.save(&patches)?;

        info!(
            patch = %patch.id,
            version = %patch.version,
            changes = patch.len(),
            "recorded patch"
        );
        Ok(patch)
    }

    /// Publish a single change immediately, bypassing the queue.
    pub fn quick_save(
        &self,
        change: SlimChange,
        version: impl Into<String>,
        tags: BTreeSet<String>,
    ) -> LedgerResult<Patch> {
        let label = if change.name.is_empty() {
            change.target_id.clone()
        } else {
            change.name.clone()
        };
        let meta = PatchMeta {
            title: format!("Quick save: {label}"),
            version: version.into(),
            patch_type: PatchType::Content,
            tags,
        };
        self.record_patch(meta, vec![change])
    }

    /// Publish everything in `queue`.
    ///
    /// The raw queue is backed up first; a failed backup aborts before
    /// anything is written. If a patch with the same version exists the
    /// changes are merged into it, otherwise a new patch is prepended. The
    /// queue is cleared only once the patch document has been written.
    pub fn commit(
        &self,
        queue: &ChangeQueue,
        backup: &dyn BackupStore,
        meta: PatchMeta,
    ) -> LedgerResult<CommitOutcome> {
        let items = queue.list()?;
        if items.is_empty() {
            return Err(LedgerError::NothingToCommit);
        }

        backup.backup_queue(&self.data_dir, &items)?;

        let slimmed = items.iter().map(slim).collect::<Result<Vec<_>, _>>()?;
        self.gate
            .check_all("changes", slimmed.iter().map(Candidate::Slim))?;

        let mut touched: Vec<PathBuf> = Vec::new();
        for item in &items {
            let path = self.entity_path(&item.category, &item.target_id);
            if !touched.contains(&path) {
                touched.push(path);
            }
        }

        let mut patches = self.patches()?;
        let (patch, merged) = match patches.iter().position(|p| p.version == meta.version) {
            Some(index) => {
                let existing = &mut patches[index];
                for change in slimmed {
                    existing.upsert_change(change.into());
                }
                existing.title = meta.title;
                existing.date = Utc::now();
                existing.tags.extend(meta.tags);
                (existing.clone(), true)
            }
            None => {
                let patch = Patch::new(
                    next_id("patch_", &patches),
                    meta.version,
                    meta.patch_type,
                    meta.title,
                    meta.tags,
                    slimmed.into_iter().map(Change::from).collect(),
                );
                patches.insert(0, patch.clone());
                (patch, false)
            }
        };

        self.save(&patches)?;
        queue.clear()?;

        info!(
            patch = %patch.id,
            version = %patch.version,
            committed = items.len(),
            merged,
            "committed queued changes"
        );
        Ok(CommitOutcome {
            patch,
            merged,
            touched,
        })
    }

    /// Store the source-control diff text on a patch.
    pub fn attach_diff(&self, id: &str, diff: String) -> LedgerResult<Patch> {
        let mut patches = self.patches()?;
        let patch = patches
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::PatchNotFound(id.to_string()))?;
        patch.diff = Some(diff);
        let updated = patch.clone();
        self.save(&patches)?;
        debug!(patch = id, "attached source control diff");
        Ok(updated)
    }

    pub(crate) fn save(&self, patches: &[Patch]) -> LedgerResult<()> {
        write_typed(self.store.as_ref(), &self.patches_path, &patches)?;
        Ok(())
    }
}

/// `<prefix><millis>`, bumped until it is not used by any patch.
pub(crate) fn next_id(prefix: &str, patches: &[Patch]) -> String {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let candidate = format!("{prefix}{millis}");
        if !patches.iter().any(|p| p.id == candidate) {
            return candidate;
        }
        millis += 1;
    }
}
