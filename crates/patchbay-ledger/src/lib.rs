//! Patch ledger for patchbay.
//!
//! This crate publishes changes as versioned patches and undoes them. It
//! provides:
//! - [`PatchLedger`] -- the newest-first patch list persisted in one JSON document
//! - commit of the pending-change queue, merging into a same-version patch
//! - quick save and audit patches that bypass the queue
//! - rollback, which records a new revert patch and never edits history
//! - the [`SourceControl`] boundary, with [`NoopSourceControl`] and
//!   [`RecordingSourceControl`] implementations

pub mod error;
pub mod ledger;
pub mod memory;
pub mod rollback;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{CommitOutcome, PatchLedger, PatchMeta, RollbackOutcome};
pub use memory::{NoopSourceControl, RecordedCommit, RecordingSourceControl};
pub use traits::SourceControl;

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use patchbay_gate::ChangeGate;
    use patchbay_queue::ChangeQueue;
    use patchbay_store::{BackupRecord, FileStore, InMemoryBackupStore, InMemoryFileStore};
    use patchbay_types::{
        Change, ChangeType, DiffEntry, ErrorKind, Patch, PatchType, SlimChange, SnapshotChange,
    };
    use serde_json::{json, Value};

    const DATA: &str = "/data";

    struct Fixture {
        store: Arc<InMemoryFileStore>,
        backup: InMemoryBackupStore,
        queue: ChangeQueue,
        ledger: PatchLedger,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryFileStore::new());
        let gate = Arc::new(ChangeGate::default());
        Fixture {
            queue: ChangeQueue::new(store.clone(), gate.clone(), DATA, "queue.json"),
            ledger: PatchLedger::new(store.clone(), gate, DATA, "patches.json"),
            backup: InMemoryBackupStore::new(),
            store,
        }
    }

    fn snapshot(target: &str, old: Option<Value>, new: Option<Value>) -> SnapshotChange {
        SnapshotChange::new(target, "Unit", "units", "entity", old, new)
    }

    fn unit_path(target: &str) -> std::path::PathBuf {
        Path::new(DATA).join("units").join(target)
    }

    fn meta(version: &str) -> PatchMeta {
        PatchMeta::new("Balance pass", version, PatchType::Patch)
    }

    // -----------------------------------------------------------------------
    // 1. Commit turns queued snapshots into slim changes
    // -----------------------------------------------------------------------
    #[test]
    fn commit_slims_queue_and_clears_it() {
        let fx = fixture();
        fx.queue
            .add(snapshot("u1.json", Some(json!({"hp": 10})), Some(json!({"hp": 20}))))
            .unwrap();

        let outcome = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.1")).unwrap();
        assert!(!outcome.merged);
        assert_eq!(outcome.patch.version, "1.0.1");
        assert!(outcome.patch.id.starts_with("patch_"));
        assert_eq!(outcome.touched, vec![unit_path("u1.json")]);

        let change = outcome.patch.changes[0].as_slim().unwrap();
        assert_eq!(change.target_id, "u1.json");
        assert_eq!(change.change_type, ChangeType::Edit);
        assert_eq!(
            change.diffs,
            vec![DiffEntry::Edited {
                path: vec!["hp".into()],
                lhs: json!(10),
                rhs: json!(20),
            }]
        );

        assert!(fx.queue.is_empty().unwrap());
        assert_eq!(fx.ledger.patches().unwrap(), vec![outcome.patch]);
        assert!(matches!(&fx.backup.records()[..], [BackupRecord::Queue(items)] if items.len() == 1));
    }

    // -----------------------------------------------------------------------
    // 2. Empty commit fails without writing anything
    // -----------------------------------------------------------------------
    #[test]
    fn empty_commit_is_bad_request_and_writes_nothing() {
        let fx = fixture();
        let err = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.0")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "No queued changes to commit");
        assert!(fx.store.is_empty());
        assert!(fx.backup.records().is_empty());
    }

    // -----------------------------------------------------------------------
    // 3. N distinct queued changes make an N-change patch
    // -----------------------------------------------------------------------
    #[test]
    fn commit_keeps_one_change_per_key() {
        let fx = fixture();
        for target in ["a.json", "b.json", "c.json"] {
            fx.queue.add(snapshot(target, None, Some(json!({"hp": 1})))).unwrap();
        }
        let outcome = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.1.0")).unwrap();
        assert_eq!(outcome.patch.len(), 3);
        assert!(outcome
            .patch
            .changes
            .iter()
            .all(|c| c.as_slim().unwrap().change_type == ChangeType::Add));
        assert!(fx.queue.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // 4. Committing again under the same version merges
    // -----------------------------------------------------------------------
    #[test]
    fn same_version_commit_merges_by_key() {
        let fx = fixture();
        fx.queue
            .add(snapshot("u1.json", Some(json!({"hp": 10})), Some(json!({"hp": 20}))))
            .unwrap();
        let first = fx
            .ledger
            .commit(&fx.queue, &fx.backup, meta("2.0.0").with_tags(["balance"]))
            .unwrap();

        fx.queue
            .add(snapshot("u1.json", Some(json!({"hp": 20})), Some(json!({"hp": 35}))))
            .unwrap();
        let mut second_meta = meta("2.0.0").with_tags(["hotfix"]);
        second_meta.title = "Balance pass, take two".into();
        let second = fx.ledger.commit(&fx.queue, &fx.backup, second_meta).unwrap();

        assert!(second.merged);
        assert_eq!(second.patch.id, first.patch.id);
        assert_eq!(second.patch.title, "Balance pass, take two");
        assert_eq!(
            second.patch.tags,
            BTreeSet::from(["balance".to_string(), "hotfix".to_string()])
        );
        assert_eq!(second.patch.len(), 1);
        let change = second.patch.changes[0].as_slim().unwrap();
        assert_eq!(
            change.diffs,
            vec![DiffEntry::Edited {
                path: vec!["hp".into()],
                lhs: json!(20),
                rhs: json!(35),
            }]
        );
        assert_eq!(fx.ledger.patches().unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // 5. A failed queue backup aborts the commit
    // -----------------------------------------------------------------------
    #[test]
    fn backup_failure_aborts_commit() {
        let fx = fixture();
        fx.queue.add(snapshot("u1.json", None, Some(json!({})))).unwrap();
        fx.backup.fail(true);

        let err = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.0")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.queue.len().unwrap(), 1);
        assert!(fx.ledger.patches().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // 6. Rolling back an edit restores the previous value
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_edit_restores_previous_value() {
        let fx = fixture();
        fx.store.write_json(&unit_path("u1.json"), &json!({"hp": 20})).unwrap();
        fx.queue
            .add(snapshot("u1.json", Some(json!({"hp": 10})), Some(json!({"hp": 20}))))
            .unwrap();
        let committed = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.1")).unwrap();

        let outcome = fx.ledger.rollback(&committed.patch.id, &[]).unwrap();
        assert_eq!(fx.store.get(unit_path("u1.json")), Some(json!({"hp": 10})));
        assert_eq!(outcome.patch.version, "1.0.1-revert");
        assert!(outcome.patch.id.starts_with("patch_rollback_"));
        assert_eq!(outcome.patch.tags, BTreeSet::from(["rollback".to_string()]));
        assert_eq!(outcome.touched, vec![unit_path("u1.json")]);
        assert_eq!(outcome.skipped, 0);

        let inverted = outcome.patch.changes[0].as_slim().unwrap();
        assert_eq!(
            inverted.diffs,
            vec![DiffEntry::Edited {
                path: vec!["hp".into()],
                lhs: json!(20),
                rhs: json!(10),
            }]
        );

        let patches = fx.ledger.patches().unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].id, outcome.patch.id);
        assert_eq!(patches[1], committed.patch);
    }

    // -----------------------------------------------------------------------
    // 7. Rolling back an add deletes the entity
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_add_deletes_file() {
        let fx = fixture();
        fx.store.write_json(&unit_path("u1.json"), &json!({"hp": 1})).unwrap();
        fx.queue.add(snapshot("u1.json", None, Some(json!({"hp": 1})))).unwrap();
        let committed = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.0")).unwrap();

        let outcome = fx.ledger.rollback(&committed.patch.id, &[]).unwrap();
        assert!(!fx.store.exists(&unit_path("u1.json")));
        assert_eq!(
            outcome.patch.changes[0].as_slim().unwrap().change_type,
            ChangeType::Delete
        );
    }

    // -----------------------------------------------------------------------
    // 8. Rolling back a delete records an add without recreating the file
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_delete_only_records_audit() {
        let fx = fixture();
        let change = SlimChange::new("u1.json", "Unit", "units", "entity", ChangeType::Delete, vec![]);
        let recorded = fx
            .ledger
            .record_patch(PatchMeta::new("Delete u1", "1.0.0", PatchType::Content), vec![change])
            .unwrap();

        let outcome = fx.ledger.rollback(&recorded.id, &[]).unwrap();
        assert!(!fx.store.exists(&unit_path("u1.json")));
        assert!(outcome.touched.is_empty());
        assert_eq!(
            outcome.patch.changes[0].as_slim().unwrap().change_type,
            ChangeType::Add
        );
    }

    // -----------------------------------------------------------------------
    // 9. Missing entity files are skipped, not fatal
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_skips_missing_entity() {
        let fx = fixture();
        fx.store.write_json(&unit_path("u2.json"), &json!({"hp": 5})).unwrap();
        for target in ["u1.json", "u2.json"] {
            fx.queue
                .add(snapshot(target, Some(json!({"hp": 1})), Some(json!({"hp": 5}))))
                .unwrap();
        }
        let committed = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.0")).unwrap();

        let outcome = fx.ledger.rollback(&committed.patch.id, &[]).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.patch.len(), 1);
        assert_eq!(fx.store.get(unit_path("u2.json")), Some(json!({"hp": 1})));
    }

    // -----------------------------------------------------------------------
    // 10. Registered categories are searched before the recorded one
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_finds_moved_entity() {
        let fx = fixture();
        let moved = Path::new(DATA).join("heroes").join("u1.json");
        fx.store.write_json(&moved, &json!({"hp": 20})).unwrap();
        fx.queue
            .add(snapshot("u1.json", Some(json!({"hp": 10})), Some(json!({"hp": 20}))))
            .unwrap();
        let committed = fx.ledger.commit(&fx.queue, &fx.backup, meta("1.0.0")).unwrap();

        let outcome = fx
            .ledger
            .rollback(&committed.patch.id, &["heroes".to_string()])
            .unwrap();
        assert_eq!(outcome.touched, vec![moved.clone()]);
        assert_eq!(fx.store.get(moved), Some(json!({"hp": 10})));
    }

    // -----------------------------------------------------------------------
    // 11. Legacy snapshot changes roll back by swapping old and new
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_legacy_snapshot_changes() {
        let fx = fixture();
        fx.store
            .write_json(&unit_path("u1.json"), &json!({"stats": {"hp": 20}}))
            .unwrap();
        let mut field_change = snapshot("u1.json", Some(json!(10)), Some(json!(20)));
        field_change.field = "stats.hp".into();
        let deleted = snapshot("u2.json", Some(json!({"hp": 3})), None);

        let legacy = Patch::new(
            "patch_legacy",
            "0.9.0",
            PatchType::Patch,
            "Old format",
            BTreeSet::new(),
            vec![Change::from(field_change), Change::from(deleted)],
        );
        fx.ledger.save(&[legacy]).unwrap();

        let outcome = fx.ledger.rollback("patch_legacy", &[]).unwrap();
        assert_eq!(
            fx.store.get(unit_path("u1.json")),
            Some(json!({"stats": {"hp": 10}}))
        );
        assert_eq!(fx.store.get(unit_path("u2.json")), Some(json!({"hp": 3})));
        assert!(outcome.patch.changes.iter().all(Change::is_legacy));
    }

    // -----------------------------------------------------------------------
    // 12. Unknown patch ids are NotFound
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_unknown_patch() {
        let fx = fixture();
        let err = fx.ledger.rollback("patch_404", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fx.ledger.get("patch_404").unwrap_err().kind(), ErrorKind::NotFound);
    }

    // -----------------------------------------------------------------------
    // 13. record_patch enumerates every invalid field
    // -----------------------------------------------------------------------
    #[test]
    fn record_patch_rejects_invalid_changes() {
        let fx = fixture();
        let good = SlimChange::new("u1.json", "", "units", "entity", ChangeType::Edit, vec![]);
        let bad = SlimChange::new("", "", "", "entity", ChangeType::Edit, vec![]);

        let err = fx
            .ledger
            .record_patch(meta("1.0.0"), vec![good, bad])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        let message = err.to_string();
        assert!(message.contains("changes.1.target_id"));
        assert!(message.contains("changes.1.category"));
        assert!(fx.ledger.patches().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // 14. Quick save publishes one content patch
    // -----------------------------------------------------------------------
    #[test]
    fn quick_save_records_content_patch() {
        let fx = fixture();
        let change = SlimChange::new("u1.json", "Knight", "units", "entity", ChangeType::Add, vec![]);
        let patch = fx
            .ledger
            .quick_save(change, "1.0.2", BTreeSet::from(["quick".to_string()]))
            .unwrap();
        assert_eq!(patch.title, "Quick save: Knight");
        assert_eq!(patch.patch_type, PatchType::Content);
        assert_eq!(patch.len(), 1);
        assert_eq!(fx.ledger.get(&patch.id).unwrap(), patch);
    }

    // -----------------------------------------------------------------------
    // 15. Patch ids never collide and newest comes first
    // -----------------------------------------------------------------------
    #[test]
    fn patch_ids_are_unique_and_prepended() {
        let fx = fixture();
        let mut ids = Vec::new();
        for i in 0..5 {
            let change = SlimChange::new(format!("u{i}.json"), "", "units", "entity", ChangeType::Add, vec![]);
            ids.push(fx.ledger.record_patch(meta("1.0.0"), vec![change]).unwrap().id);
        }
        let stored: Vec<_> = fx.ledger.patches().unwrap().into_iter().map(|p| p.id).collect();
        ids.reverse();
        assert_eq!(stored, ids);
        let unique: BTreeSet<_> = stored.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    // -----------------------------------------------------------------------
    // 16. attach_diff stores the diff text
    // -----------------------------------------------------------------------
    #[test]
    fn attach_diff_updates_patch() {
        let fx = fixture();
        let change = SlimChange::new("u1.json", "", "units", "entity", ChangeType::Add, vec![]);
        let patch = fx.ledger.record_patch(meta("1.0.0"), vec![change]).unwrap();
        fx.ledger.attach_diff(&patch.id, "M units/u1.json".into()).unwrap();
        assert_eq!(
            fx.ledger.get(&patch.id).unwrap().diff.as_deref(),
            Some("M units/u1.json")
        );
    }

    // -----------------------------------------------------------------------
    // 17. Patches are stored with sorted keys
    // -----------------------------------------------------------------------
    #[test]
    fn stored_patch_keys_are_sorted() {
        let fx = fixture();
        let change = SlimChange::new("u1.json", "", "units", "entity", ChangeType::Add, vec![]);
        fx.ledger.record_patch(meta("1.0.0"), vec![change]).unwrap();
        let stored = fx.store.get("/data/patches.json").unwrap();
        let keys: Vec<_> = stored[0].as_object().unwrap().keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    // -----------------------------------------------------------------------
    // 18. Rolling back a multi-entry diff applies every inverse in order
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_restores_array_append_and_truncate() {
        let fx = fixture();
        let old = json!({
            "hp": 10,
            "drops": ["a", "b", "c"],
            "tags": ["x"],
            "stats": {"atk": 1}
        });
        let new = json!({
            "hp": 12,
            "drops": ["a", "z"],
            "tags": ["x", "y", "w"],
            "stats": {"atk": 1, "def": 2},
            "name": "Knight"
        });
        fx.store.write_json(&unit_path("u1.json"), &new).unwrap();
        fx.queue
            .add(snapshot("u1.json", Some(old.clone()), Some(new.clone())))
            .unwrap();
        let committed = fx.ledger.commit(&fx.queue, &fx.backup, meta("2.0.0")).unwrap();
        let forward = committed.patch.changes[0].as_slim().unwrap().diffs.clone();
        assert!(forward.len() >= 5);

        let outcome = fx.ledger.rollback(&committed.patch.id, &[]).unwrap();
        assert_eq!(fx.store.get(unit_path("u1.json")), Some(old));
        assert_eq!(
            outcome.patch.changes[0].as_slim().unwrap().diffs,
            patchbay_diff::invert_all(&forward)
        );
    }

    // -----------------------------------------------------------------------
    // 19. An entry that no longer matches leaves no trace in the file
    // -----------------------------------------------------------------------
    #[test]
    fn rollback_skips_stale_entry_without_side_effects() {
        let fx = fixture();
        fx.store.write_json(&unit_path("u1.json"), &json!({"hp": 6})).unwrap();
        let change = SlimChange::new(
            "u1.json",
            "",
            "units",
            "entity",
            ChangeType::Edit,
            vec![
                DiffEntry::DeletedKey {
                    path: vec!["drops".into(), 3usize.into()],
                    lhs: json!("gem"),
                },
                DiffEntry::Edited {
                    path: vec!["hp".into()],
                    lhs: json!(5),
                    rhs: json!(6),
                },
            ],
        );
        let patch = fx.ledger.record_patch(meta("1.0.0"), vec![change]).unwrap();

        fx.ledger.rollback(&patch.id, &[]).unwrap();
        assert_eq!(fx.store.get(unit_path("u1.json")), Some(json!({"hp": 5})));
    }
}
