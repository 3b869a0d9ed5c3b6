use std::path::{Path, PathBuf};

use serde_json::Value;

use patchbay_types::SnapshotChange;

use crate::error::StoreResult;

/// JSON document storage.
///
/// All implementations must satisfy these invariants:
/// - `write_json` is atomic: a crash mid-write loses the write but never
///   leaves a half-written document behind.
/// - `read_json` on a missing document fails with `StoreError::NotFound`.
/// - Listings return bare names (not paths), sorted.
pub trait FileStore: Send + Sync {
    /// Whether a document exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read and parse the document at `path`.
    fn read_json(&self, path: &Path) -> StoreResult<Value>;

    /// Atomically replace the document at `path`, creating parent
    /// directories as needed.
    fn write_json(&self, path: &Path, value: &Value) -> StoreResult<()>;

    /// Delete the document at `path`. Deleting a missing document is a no-op.
    fn delete_file(&self, path: &Path) -> StoreResult<()>;

    /// Names of the files directly inside `dir` whose extension is one of
    /// `extensions` (without the dot). A missing directory lists as empty.
    fn list_files(&self, dir: &Path, extensions: &[&str]) -> StoreResult<Vec<String>>;

    /// Names of the directories directly inside `dir`, minus `exclude`.
    fn list_directories(&self, dir: &Path, exclude: &[&str]) -> StoreResult<Vec<String>>;
}

/// Safety copies taken before destructive operations.
///
/// Every kind of backup is rotated: only the newest few copies are kept.
pub trait BackupStore: Send + Sync {
    /// Copy the file at `path`. Returns `Ok(None)` when there is nothing to
    /// back up (the file does not exist).
    fn backup_file(&self, data_dir: &Path, path: &Path) -> StoreResult<Option<PathBuf>>;

    /// Persist the raw snapshot queue (full old/new documents).
    fn backup_queue(&self, data_dir: &Path, items: &[SnapshotChange]) -> StoreResult<()>;

    /// Copy the whole data directory. Returns the backup location.
    fn create_full_backup(&self, data_dir: &Path) -> StoreResult<PathBuf>;
}
