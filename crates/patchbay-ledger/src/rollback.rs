//! Rolling back a published patch.
//!
//! Rollback inverts each change against the entity as it is on disk now,
//! not as it was when the patch was published. The original patch is left
//! untouched; the inverted changes are recorded as a new revert patch.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{info, warn};

use patchbay_diff::{apply_all, invert_all, write_field};
use patchbay_types::{is_root_field, Change, ChangeType, Patch, SlimChange, SnapshotChange};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{next_id, PatchLedger, RollbackOutcome};

const ROLLBACK_TAG: &str = "rollback";

/// One reverted change and the file it touched, if any.
type Reverted = (Change, Option<PathBuf>);

impl PatchLedger {
    /// Undo patch `patch_id` and record the revert patch.
    ///
    /// Entity files are looked up in `categories` first and then in the
    /// category recorded on the change. A change whose file cannot be found
    /// is skipped with a warning.
    pub fn rollback(&self, patch_id: &str, categories: &[String]) -> LedgerResult<RollbackOutcome> {
        let mut patches = self.patches()?;
        let original = patches
            .iter()
            .find(|p| p.id == patch_id)
            .cloned()
            .ok_or_else(|| LedgerError::PatchNotFound(patch_id.to_string()))?;

        let mut inverted = Vec::with_capacity(original.len());
        let mut touched = Vec::new();
        let mut skipped = 0;
        for change in &original.changes {
            let reverted = match change {
                Change::Slim(c) => self.revert_slim(c, categories)?,
                Change::Snapshot(c) => self.revert_snapshot(c, categories)?,
            };
            match reverted {
                Some((change, path)) => {
                    inverted.push(change);
                    touched.extend(path);
                }
                None => skipped += 1,
            }
        }

        let patch = Patch::new(
            next_id("patch_rollback_", &patches),
            original.revert_version(),
            original.patch_type,
            format!("Rollback: {}", original.title),
            BTreeSet::from([ROLLBACK_TAG.to_string()]),
            inverted,
        );
        patches.insert(0, patch.clone());
        self.save(&patches)?;

        info!(
            original = %original.id,
            patch = %patch.id,
            reverted = patch.len(),
            skipped,
            "rolled back patch"
        );
        Ok(RollbackOutcome {
            patch,
            touched,
            skipped,
        })
    }

    /// First existing file for the target: registered categories, then the
    /// recorded category.
    fn locate(&self, category: &str, target_id: &str, categories: &[String]) -> Option<PathBuf> {
        categories
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(category))
            .map(|c| self.entity_path(c, target_id))
            .find(|p| self.store.exists(p))
    }

    fn revert_slim(&self, change: &SlimChange, categories: &[String]) -> LedgerResult<Option<Reverted>> {
        let inverted = SlimChange {
            change_type: change.change_type.inverse(),
            diffs: invert_all(&change.diffs),
            ..change.clone()
        };
        let whole_document = is_root_field(&change.field);

        if whole_document && change.change_type == ChangeType::Delete {
            warn!(
                target = %change.target_id,
                category = %change.category,
                "deleted document cannot be rebuilt from its diff; restore it manually from a backup"
            );
            return Ok(Some((inverted.into(), None)));
        }

        let Some(path) = self.locate(&change.category, &change.target_id, categories) else {
            warn!(
                target = %change.target_id,
                category = %change.category,
                "entity file not found; skipping change"
            );
            return Ok(None);
        };

        if whole_document && change.change_type == ChangeType::Add {
            self.store.delete_file(&path)?;
        } else {
            let mut doc = self.store.read_json(&path)?;
            let report = apply_all(&mut doc, &inverted.diffs);
            if !report.is_clean() {
                warn!(
                    target = %change.target_id,
                    blocked = report.blocked,
                    unresolved = report.unresolved,
                    "some diff entries no longer match the document"
                );
            }
            self.store.write_json(&path, &doc)?;
        }
        Ok(Some((inverted.into(), Some(path))))
    }

    /// Legacy snapshot changes carry both documents, so they are reverted by
    /// writing `old` back.
    fn revert_snapshot(
        &self,
        change: &SnapshotChange,
        categories: &[String],
    ) -> LedgerResult<Option<Reverted>> {
        let swapped = change.swapped();
        let whole_document = is_root_field(&change.field);

        let path = match self.locate(&change.category, &change.target_id, categories) {
            Some(path) => path,
            None if whole_document && swapped.new.is_some() => {
                self.entity_path(&change.category, &change.target_id)
            }
            None => {
                warn!(
                    target = %change.target_id,
                    category = %change.category,
                    "entity file not found; skipping change"
                );
                return Ok(None);
            }
        };

        if whole_document {
            match &swapped.new {
                Some(doc) => self.store.write_json(&path, doc)?,
                None => self.store.delete_file(&path)?,
            }
        } else {
            let mut doc = self.store.read_json(&path)?;
            write_field(&mut doc, &change.field, swapped.new.clone())?;
            self.store.write_json(&path, &doc)?;
        }
        Ok(Some((swapped.into(), Some(path))))
    }
}
