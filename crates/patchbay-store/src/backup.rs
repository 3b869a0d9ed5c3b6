//! Rotating safety backups.
//!
//! Layout under `<data_dir>/<backup_dir>/`:
//!
//! ```text
//! files/<relative path without extension>/<millis>.json
//! queue/queue-<millis>.json
//! full/<millis>/...
//! ```
//!
//! Timestamps are zero-padded so lexical order is chronological. Each kind of
//! backup keeps only the newest `retention` entries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use patchbay_types::SnapshotChange;

use crate::error::{StoreError, StoreResult};
use crate::local::LocalFileStore;
use crate::traits::{BackupStore, FileStore};

/// Default name of the backup directory inside the data directory.
pub const DEFAULT_BACKUP_DIR: &str = ".backups";

/// Default number of backups kept per file, queue, and full snapshot.
pub const DEFAULT_RETENTION: usize = 5;

/// Filesystem backups rooted inside the data directory.
#[derive(Clone, Debug)]
pub struct LocalBackupStore {
    backup_dir: String,
    retention: usize,
}

impl Default for LocalBackupStore {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_DIR, DEFAULT_RETENTION)
    }
}

impl LocalBackupStore {
    pub fn new(backup_dir: impl Into<String>, retention: usize) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            retention: retention.max(1),
        }
    }

    pub fn root(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.backup_dir)
    }

    /// First free `<millis><suffix>` name in `dir`.
    fn stamped(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
        let mut millis = Utc::now().timestamp_millis().max(0);
        loop {
            let candidate = dir.join(format!("{prefix}{millis:013}{suffix}"));
            if !candidate.exists() {
                return candidate;
            }
            millis += 1;
        }
    }

    /// Delete the oldest entries in `dir` whose names start with `prefix`.
    fn prune(&self, dir: &Path, prefix: &str) -> StoreResult<()> {
        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
            .map(|e| e.into_path())
            .collect();

        if entries.len() <= self.retention {
            return Ok(());
        }
        let excess = entries.len() - self.retention;
        for old in entries.drain(..excess) {
            if old.is_dir() {
                fs::remove_dir_all(&old)?;
            } else {
                fs::remove_file(&old)?;
            }
            debug!(path = %old.display(), "pruned backup");
        }
        Ok(())
    }

    fn copy_tree(&self, data_dir: &Path, dest: &Path) -> StoreResult<usize> {
        let backup_root = self.root(data_dir);
        let mut copied = 0;
        let walker = WalkDir::new(data_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.path() != backup_root && e.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Backup(e.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(data_dir)
                .map_err(|e| StoreError::Backup(e.to_string()))?;
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}

impl BackupStore for LocalBackupStore {
    fn backup_file(&self, data_dir: &Path, path: &Path) -> StoreResult<Option<PathBuf>> {
        if !path.is_file() {
            return Ok(None);
        }
        let rel = path
            .strip_prefix(data_dir)
            .unwrap_or_else(|_| Path::new(path.file_name().unwrap_or(path.as_os_str())));
        let dir = self.root(data_dir).join("files").join(rel.with_extension(""));
        fs::create_dir_all(&dir)?;

        let dest = Self::stamped(&dir, "", ".json");
        fs::copy(path, &dest)?;
        self.prune(&dir, "")?;

        debug!(source = %path.display(), backup = %dest.display(), "backed up file");
        Ok(Some(dest))
    }

    fn backup_queue(&self, data_dir: &Path, items: &[SnapshotChange]) -> StoreResult<()> {
        let dir = self.root(data_dir).join("queue");
        fs::create_dir_all(&dir)?;
        let dest = Self::stamped(&dir, "queue-", ".json");

        let value: Value =
            serde_json::to_value(items).map_err(|e| StoreError::serialization(&dest, e))?;
        LocalFileStore.write_json(&dest, &value)?;
        self.prune(&dir, "queue-")?;

        debug!(items = items.len(), backup = %dest.display(), "backed up queue");
        Ok(())
    }

    fn create_full_backup(&self, data_dir: &Path) -> StoreResult<PathBuf> {
        let dir = self.root(data_dir).join("full");
        fs::create_dir_all(&dir)?;
        let dest = Self::stamped(&dir, "", "");
        fs::create_dir_all(&dest)?;

        let copied = match self.copy_tree(data_dir, &dest) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, backup = %dest.display(), "full backup failed");
                let _ = fs::remove_dir_all(&dest);
                return Err(e);
            }
        };
        self.prune(&dir, "")?;

        info!(files = copied, backup = %dest.display(), "created full backup");
        Ok(dest)
    }
}

/// A recorded backup call on [`InMemoryBackupStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackupRecord {
    File(PathBuf),
    Queue(Vec<SnapshotChange>),
    Full(PathBuf),
}

/// Backup store that only records what it was asked to do.
///
/// Can be switched to fail every call, to exercise abort paths.
#[derive(Debug, Default)]
pub struct InMemoryBackupStore {
    records: Mutex<Vec<BackupRecord>>,
    failing: AtomicBool,
}

impl InMemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<BackupRecord> {
        self.records.lock().expect("lock poisoned").clone()
    }

    fn record(&self, record: BackupRecord) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backup("backup store unavailable".into()));
        }
        self.records.lock().expect("lock poisoned").push(record);
        Ok(())
    }
}

impl BackupStore for InMemoryBackupStore {
    fn backup_file(&self, _data_dir: &Path, path: &Path) -> StoreResult<Option<PathBuf>> {
        self.record(BackupRecord::File(path.to_path_buf()))?;
        Ok(Some(path.to_path_buf()))
    }

    fn backup_queue(&self, _data_dir: &Path, items: &[SnapshotChange]) -> StoreResult<()> {
        self.record(BackupRecord::Queue(items.to_vec()))
    }

    fn create_full_backup(&self, data_dir: &Path) -> StoreResult<PathBuf> {
        let dest = data_dir.join(DEFAULT_BACKUP_DIR).join("full");
        self.record(BackupRecord::Full(dest.clone()))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn count(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn backup_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackupStore::default();
        let out = store
            .backup_file(dir.path(), &dir.path().join("units/u1.json"))
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn file_backups_are_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("units").join("u1.json");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, r#"{"hp": 10}"#).unwrap();

        let store = LocalBackupStore::new(".backups", 2);
        let mut last = None;
        for _ in 0..4 {
            last = store.backup_file(dir.path(), &file).unwrap();
        }

        let backup_dir = dir.path().join(".backups/files/units/u1");
        assert_eq!(count(&backup_dir), 2);
        let last = last.unwrap();
        assert_eq!(fs::read_to_string(last).unwrap(), r#"{"hp": 10}"#);
    }

    #[test]
    fn queue_backup_writes_snapshot_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackupStore::default();
        let item = SnapshotChange::new("u1.json", "Unit", "units", "entity", None, Some(json!(1)));
        store.backup_queue(dir.path(), &[item.clone()]).unwrap();

        let queue_dir = dir.path().join(".backups/queue");
        let names = LocalFileStore.list_files(&queue_dir, &["json"]).unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("queue-"));

        let saved: Vec<SnapshotChange> =
            crate::json::read_typed(&LocalFileStore, &queue_dir.join(&names[0])).unwrap();
        assert_eq!(saved, vec![item]);
    }

    #[test]
    fn full_backup_skips_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("units")).unwrap();
        fs::write(dir.path().join("units/u1.json"), "{}").unwrap();
        fs::write(dir.path().join("patches.json"), "[]").unwrap();

        let store = LocalBackupStore::default();
        let first = store.create_full_backup(dir.path()).unwrap();
        assert!(first.join("units/u1.json").is_file());
        assert!(first.join("patches.json").is_file());

        let second = store.create_full_backup(dir.path()).unwrap();
        assert!(!second.join(".backups").exists());
        assert_ne!(first, second);
    }

    #[test]
    fn in_memory_records_and_fails() {
        let store = InMemoryBackupStore::new();
        let data = Path::new("/data");
        store.backup_file(data, Path::new("/data/units/u1.json")).unwrap();
        store.backup_queue(data, &[]).unwrap();
        assert_eq!(store.records().len(), 2);

        store.fail(true);
        assert!(matches!(
            store.create_full_backup(data),
            Err(StoreError::Backup(_))
        ));
        assert_eq!(store.records().len(), 2);
    }
}
