//! The pending-change queue.
//!
//! The [`ChangeQueue`] keeps its entries in a single JSON document. Every
//! operation is a read-modify-write of that document; nothing is cached
//! between calls.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use patchbay_diff::{write_field, ApplyOutcome};
use patchbay_gate::ChangeGate;
use patchbay_store::{read_optional, write_typed, FileStore, StoreError};
use patchbay_types::{entity_file_name, is_root_field, target_matches, upsert_by_key, SnapshotChange};

use crate::error::{QueueError, QueueResult};

/// Ordered list of not-yet-published snapshot changes.
///
/// At most one entry exists per (target, field): adding a second change for
/// the same key keeps the first `old` and adopts the latest `new`. Dropping
/// an entry restores the entity to the entry's `old` state.
pub struct ChangeQueue {
    store: Arc<dyn FileStore>,
    gate: Arc<ChangeGate>,
    data_dir: PathBuf,
    queue_path: PathBuf,
}

impl std::fmt::Debug for ChangeQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("data_dir", &self.data_dir)
            .field("queue_path", &self.queue_path)
            .finish()
    }
}

impl ChangeQueue {
    /// Create a queue persisted at `<data_dir>/<queue_file>`.
    pub fn new(
        store: Arc<dyn FileStore>,
        gate: Arc<ChangeGate>,
        data_dir: impl Into<PathBuf>,
        queue_file: &str,
    ) -> Self {
        let data_dir = data_dir.into();
        let queue_path = data_dir.join(queue_file);
        Self {
            store,
            gate,
            data_dir,
            queue_path,
        }
    }

    /// Location of the queue document.
    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    /// Location of an entity's document.
    pub fn entity_path(&self, category: &str, target_id: &str) -> PathBuf {
        self.data_dir.join(category).join(entity_file_name(target_id))
    }

    /// All queued changes in order. A missing queue document is an empty queue.
    pub fn list(&self) -> QueueResult<Vec<SnapshotChange>> {
        Ok(read_optional(self.store.as_ref(), &self.queue_path)?.unwrap_or_default())
    }

    /// The queued change at `index`.
    pub fn get(&self, index: usize) -> QueueResult<SnapshotChange> {
        let items = self.list()?;
        let len = items.len();
        items
            .into_iter()
            .nth(index)
            .ok_or(QueueError::IndexOutOfRange { index, len })
    }

    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.list()?.is_empty())
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Queue a change, merging it into an existing entry for the same key.
    pub fn add(&self, change: SnapshotChange) -> QueueResult<Vec<SnapshotChange>> {
        self.gate.check(&change)?;
        let mut items = self.list()?;
        let target = change.target_id.clone();
        let merged = upsert_by_key(&mut items, change, SnapshotChange::merge_later);
        self.save(&items)?;
        debug!(target = %target, merged, queued = items.len(), "queued change");
        Ok(items)
    }

    /// Replace the entry at `index` wholesale.
    pub fn update_at(&self, index: usize, change: SnapshotChange) -> QueueResult<Vec<SnapshotChange>> {
        self.gate.check(&change)?;
        let mut items = self.list()?;
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(QueueError::IndexOutOfRange { index, len })?;
        *slot = change;
        self.save(&items)?;
        Ok(items)
    }

    /// Drop the entry at `index`, reverting its entity first.
    pub fn remove_at(&self, index: usize) -> QueueResult<Vec<SnapshotChange>> {
        self.remove_many(&[index])
    }

    /// Drop several entries, reverting each one first.
    ///
    /// Indices refer to the queue as it is before the call; duplicates are
    /// ignored and the order they are given in does not matter. Every index
    /// is checked before anything is reverted.
    pub fn remove_many(&self, indices: &[usize]) -> QueueResult<Vec<SnapshotChange>> {
        if indices.is_empty() {
            return Err(QueueError::EmptyIndexList);
        }
        let mut items = self.list()?;
        let len = items.len();
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(&index) = unique.iter().find(|&&i| i >= len) {
            return Err(QueueError::IndexOutOfRange { index, len });
        }

        for &index in unique.iter().rev() {
            self.revert(&items[index]);
            items.remove(index);
        }
        self.save(&items)?;
        info!(removed = unique.len(), remaining = items.len(), "removed queued changes");
        Ok(items)
    }

    /// Drop every entry whose target matches `id` (with or without `.json`).
    pub fn remove_by_target_id(&self, id: &str) -> QueueResult<Vec<SnapshotChange>> {
        let items = self.list()?;
        let (matched, kept): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|item| target_matches(&item.target_id, id));
        for item in matched.iter().rev() {
            self.revert(item);
        }
        self.save(&kept)?;
        debug!(target = id, removed = matched.len(), "removed queued changes by target");
        Ok(kept)
    }

    /// Empty the queue without reverting anything. Used once the changes
    /// have been published.
    pub fn clear(&self) -> QueueResult<()> {
        self.save(&[])
    }

    /// Restore the entity behind `entry` to the entry's `old` state.
    ///
    /// A change with no `old` created its target, so the target is removed.
    /// Failures are logged and swallowed: dropping a queued change always
    /// succeeds.
    pub fn revert(&self, entry: &SnapshotChange) {
        let path = self.entity_path(&entry.category, &entry.target_id);
        if let Err(e) = self.try_revert(entry, &path) {
            warn!(
                target = %entry.target_id,
                field = %entry.field,
                path = %path.display(),
                error = %e,
                "failed to revert dropped change"
            );
        }
    }

    fn try_revert(&self, entry: &SnapshotChange, path: &Path) -> QueueResult<()> {
        if is_root_field(&entry.field) {
            match &entry.old {
                Some(old) => self.store.write_json(path, old)?,
                None => self.store.delete_file(path)?,
            }
            return Ok(());
        }

        let mut doc = match self.store.read_json(path) {
            Ok(doc) => doc,
            Err(StoreError::NotFound(_)) if entry.old.is_some() => Value::Object(Default::default()),
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let outcome = write_field(&mut doc, &entry.field, entry.old.clone())?;
        if outcome == ApplyOutcome::Applied {
            self.store.write_json(path, &doc)?;
        }
        Ok(())
    }

    fn save(&self, items: &[SnapshotChange]) -> QueueResult<()> {
        write_typed(self.store.as_ref(), &self.queue_path, &items)?;
        Ok(())
    }
}
