//! Sequencing of every mutating operation: validate, back up, mutate the
//! queue or ledger, then hand the touched files to source control.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use patchbay_diff::{field_value, slim, write_field, ApplyOutcome};
use patchbay_gate::{Candidate, ChangeGate, GateError, StaticValidator, Validator};
use patchbay_ledger::{NoopSourceControl, PatchLedger, PatchMeta, SourceControl};
use patchbay_queue::ChangeQueue;
use patchbay_store::{BackupStore, FileStore, LocalBackupStore, LocalFileStore, StoreError};
use patchbay_types::{
    entity_file_name, is_root_field, ChangeType, FieldIssue, Patch, PatchType, SlimChange,
    SnapshotChange, ROOT_FIELD,
};

use crate::config::RolloutConfig;
use crate::error::{RolloutError, RolloutResult};

const DELETE_TAG: &str = "delete";

/// How [`RolloutCoordinator::save_entity`] publishes the edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveMode {
    /// Hold the edit in the queue until the next commit.
    Queue,
    /// Publish the edit right away as a single-change patch.
    Immediate {
        version: String,
        tags: BTreeSet<String>,
    },
}

/// What [`RolloutCoordinator::save_entity`] did with the edit.
#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    /// The edit is queued; the queue now holds `queued` changes.
    Queued { queued: usize },
    /// The edit was published.
    Published(Patch),
}

/// Entry point for applications embedding patchbay.
///
/// Owns the queue and the ledger for one data directory and drives the
/// backup, file, validation and source-control capabilities it is given.
pub struct RolloutCoordinator {
    config: RolloutConfig,
    store: Arc<dyn FileStore>,
    backup: Arc<dyn BackupStore>,
    scm: Arc<dyn SourceControl>,
    gate: Arc<ChangeGate>,
    queue: ChangeQueue,
    ledger: PatchLedger,
}

impl std::fmt::Debug for RolloutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolloutCoordinator")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .finish()
    }
}

impl RolloutCoordinator {
    pub fn new(
        config: RolloutConfig,
        store: Arc<dyn FileStore>,
        backup: Arc<dyn BackupStore>,
        scm: Arc<dyn SourceControl>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        let gate = Arc::new(ChangeGate::with_validator(config.gate.clone(), validator));
        let queue = ChangeQueue::new(
            store.clone(),
            gate.clone(),
            &config.data_dir,
            &config.queue_file,
        );
        let ledger = PatchLedger::new(
            store.clone(),
            gate.clone(),
            &config.data_dir,
            &config.patches_file,
        );
        Self {
            config,
            store,
            backup,
            scm,
            gate,
            queue,
            ledger,
        }
    }

    /// Local-disk stores and backups, no source control, no schemas.
    pub fn local(config: RolloutConfig) -> Self {
        let backup = LocalBackupStore::new(config.backup_dir.clone(), config.backup_retention);
        Self::new(
            config,
            Arc::new(LocalFileStore::new()),
            Arc::new(backup),
            Arc::new(NoopSourceControl),
            Arc::new(StaticValidator::new()),
        )
    }

    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Location of an entity's document.
    pub fn entity_path(&self, category: &str, target_id: &str) -> PathBuf {
        self.config
            .data_dir
            .join(category)
            .join(entity_file_name(target_id))
    }

    /// Registered categories, or every directory in the data directory.
    pub fn categories(&self) -> RolloutResult<Vec<String>> {
        if !self.config.categories.is_empty() {
            return Ok(self.config.categories.clone());
        }
        let exclude: Vec<&str> = self.config.excluded_dirs.iter().map(String::as_str).collect();
        Ok(self.store.list_directories(&self.config.data_dir, &exclude)?)
    }

    /// The current document of an entity, if it exists.
    pub fn read_entity(&self, category: &str, target_id: &str) -> RolloutResult<Option<Value>> {
        match self.store.read_json(&self.entity_path(category, target_id)) {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ---------------------------------------------------------------
    // Entity edits
    // ---------------------------------------------------------------

    /// Write `value` to `field` of an entity and record the edit.
    ///
    /// The resulting document is validated against the category schema and
    /// the existing file is backed up before anything is written.
    pub fn save_entity(
        &self,
        category: &str,
        target_id: &str,
        field: &str,
        value: Value,
        mode: SaveMode,
    ) -> RolloutResult<SaveOutcome> {
        let path = self.entity_path(category, target_id);
        let current = self.read_entity(category, target_id)?;

        let (old, next_doc) = if is_root_field(field) {
            (current, value.clone())
        } else {
            let mut doc = current.unwrap_or_else(|| Value::Object(Default::default()));
            let old = field_value(&doc, field)?.cloned();
            if write_field(&mut doc, field, Some(value.clone()))? != ApplyOutcome::Applied {
                return Err(GateError::Invalid {
                    issues: vec![FieldIssue::new(field, "cannot be written in this document")],
                }
                .into());
            }
            (old, doc)
        };

        let change = SnapshotChange::new(
            target_id,
            display_name(&next_doc, target_id),
            category,
            field,
            old,
            Some(value),
        );
        self.gate.check(Candidate::Document {
            category,
            value: &next_doc,
        })?;
        self.gate.check(&change)?;

        self.backup.backup_file(&self.config.data_dir, &path)?;
        self.store.write_json(&path, &next_doc)?;
        debug!(category, target = target_id, field, "saved entity");

        match mode {
            SaveMode::Queue => {
                let queued = self.queue.add(change)?.len();
                Ok(SaveOutcome::Queued { queued })
            }
            SaveMode::Immediate { version, tags } => {
                let patch = self.quick_save(slim(&change)?, version, tags)?;
                Ok(SaveOutcome::Published(patch))
            }
        }
    }

    /// Delete an entity and record an audit patch for it.
    ///
    /// The audit patch is best-effort: if it cannot be recorded the delete
    /// still stands and `None` is returned.
    pub fn delete_entity(
        &self,
        category: &str,
        target_id: &str,
        version: &str,
    ) -> RolloutResult<Option<Patch>> {
        let path = self.entity_path(category, target_id);
        let Some(current) = self.read_entity(category, target_id)? else {
            return Err(RolloutError::EntityNotFound(format!(
                "{category}/{}",
                entity_file_name(target_id)
            )));
        };

        self.backup.backup_file(&self.config.data_dir, &path)?;
        self.store.delete_file(&path)?;
        info!(category, target = target_id, "deleted entity");

        let name = display_name(&current, target_id);
        let change = SlimChange::new(
            entity_file_name(target_id),
            name.clone(),
            category,
            ROOT_FIELD,
            ChangeType::Delete,
            Vec::new(),
        )
        .with_tags([DELETE_TAG]);
        let meta = PatchMeta::new(format!("Delete: {name}"), version, PatchType::Content)
            .with_tags([DELETE_TAG]);

        match self.ledger.record_patch(meta, vec![change]) {
            Ok(patch) => Ok(Some(self.publish(patch, vec![path]))),
            Err(e) => {
                warn!(category, target = target_id, error = %e, "failed to record delete audit patch");
                Ok(None)
            }
        }
    }

    // ---------------------------------------------------------------
    // Queue
    // ---------------------------------------------------------------

    pub fn queue(&self) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.list()?)
    }

    pub fn enqueue(&self, change: SnapshotChange) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.add(change)?)
    }

    pub fn update_queued(
        &self,
        index: usize,
        change: SnapshotChange,
    ) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.update_at(index, change)?)
    }

    pub fn remove_queued(&self, index: usize) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.remove_at(index)?)
    }

    pub fn remove_many_queued(&self, indices: &[usize]) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.remove_many(indices)?)
    }

    pub fn remove_queued_by_target(&self, target_id: &str) -> RolloutResult<Vec<SnapshotChange>> {
        Ok(self.queue.remove_by_target_id(target_id)?)
    }

    // ---------------------------------------------------------------
    // Patches
    // ---------------------------------------------------------------

    pub fn patches(&self) -> RolloutResult<Vec<Patch>> {
        Ok(self.ledger.patches()?)
    }

    pub fn patch(&self, id: &str) -> RolloutResult<Patch> {
        Ok(self.ledger.get(id)?)
    }

    /// Publish one change immediately as its own patch.
    pub fn quick_save(
        &self,
        change: SlimChange,
        version: impl Into<String>,
        tags: BTreeSet<String>,
    ) -> RolloutResult<Patch> {
        let path = self.entity_path(&change.category, &change.target_id);
        let patch = self.ledger.quick_save(change, version, tags)?;
        Ok(self.publish(patch, vec![path]))
    }

    /// Publish the whole queue.
    pub fn commit(&self, meta: PatchMeta) -> RolloutResult<Patch> {
        let outcome = self.ledger.commit(&self.queue, self.backup.as_ref(), meta)?;
        Ok(self.publish(outcome.patch, outcome.touched))
    }

    /// Undo a published patch. A full backup of the data directory is taken
    /// first; if it fails nothing is changed.
    pub fn rollback(&self, patch_id: &str) -> RolloutResult<Patch> {
        self.ledger.get(patch_id)?;
        self.backup.create_full_backup(&self.config.data_dir)?;
        let categories = self.categories()?;
        let outcome = self.ledger.rollback(patch_id, &categories)?;
        if outcome.skipped > 0 {
            warn!(
                patch = patch_id,
                skipped = outcome.skipped,
                "rollback skipped changes whose entity could not be found"
            );
        }
        Ok(self.publish(outcome.patch, outcome.touched))
    }

    /// Capture the source-control diff of everything the patch touched,
    /// store it on the patch, and commit. Failures are logged; the patch is
    /// already persisted either way.
    fn publish(&self, patch: Patch, entity_files: Vec<PathBuf>) -> Patch {
        let data_dir = &self.config.data_dir;
        let mut files = vec![self.config.patches_path()];
        files.extend(
            self.config
                .published_files
                .iter()
                .map(|f| data_dir.join(f))
                .filter(|p| self.store.exists(p)),
        );
        for file in entity_files {
            if !files.contains(&file) {
                files.push(file);
            }
        }

        let patch = match self.scm.get_staged_diff(data_dir, &files) {
            Ok(diff) => match self.ledger.attach_diff(&patch.id, diff) {
                Ok(updated) => updated,
                Err(e) => {
                    warn!(patch = %patch.id, error = %e, "failed to store source control diff");
                    patch
                }
            },
            Err(e) => {
                warn!(patch = %patch.id, error = %e, "failed to capture source control diff");
                patch
            }
        };

        let message = format!("{}: {} ({})", patch.patch_type, patch.title, patch.version);
        if let Err(e) = self.scm.commit_patch(data_dir, &patch, &message, &files) {
            warn!(patch = %patch.id, error = %e, "source control commit failed");
        }
        patch
    }
}

/// `name` of the document when it has one, the target id otherwise.
fn display_name(doc: &Value, target_id: &str) -> String {
    doc.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| target_id.trim_end_matches(".json").to_string())
}
