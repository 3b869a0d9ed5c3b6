use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::FileStore;

/// In-memory, BTreeMap-based document store.
///
/// Intended for tests and embedding. Documents are held in memory behind a
/// `RwLock`; directories exist implicitly as the parents of stored paths.
/// Writes can be switched to fail with [`Self::fail_writes`].
pub struct InMemoryFileStore {
    files: RwLock<BTreeMap<PathBuf, Value>>,
    fail_writes: AtomicBool,
}

impl InMemoryFileStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write and delete fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.files.read().expect("lock poisoned").is_empty()
    }

    /// Snapshot of a stored document, if any.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Value> {
        self.files
            .read()
            .expect("lock poisoned")
            .get(path.as_ref())
            .cloned()
    }

    /// Sorted list of every stored path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn check_writable(&self, path: &Path) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(path.to_path_buf()));
        }
        Ok(())
    }
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore for InMemoryFileStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.read().expect("lock poisoned").contains_key(path)
    }

    fn read_json(&self, path: &Path) -> StoreResult<Value> {
        self.get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn write_json(&self, path: &Path, value: &Value) -> StoreResult<()> {
        self.check_writable(path)?;
        let mut files = self.files.write().expect("lock poisoned");
        files.insert(path.to_path_buf(), value.clone());
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> StoreResult<()> {
        self.check_writable(path)?;
        let mut files = self.files.write().expect("lock poisoned");
        files.remove(path);
        Ok(())
    }

    fn list_files(&self, dir: &Path, extensions: &[&str]) -> StoreResult<Vec<String>> {
        let files = self.files.read().expect("lock poisoned");
        let names = files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.contains(&e))
            })
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        Ok(names)
    }

    fn list_directories(&self, dir: &Path, exclude: &[&str]) -> StoreResult<Vec<String>> {
        let files = self.files.read().expect("lock poisoned");
        let mut names = BTreeSet::new();
        for path in files.keys() {
            let Ok(rest) = path.strip_prefix(dir) else {
                continue;
            };
            let mut components = rest.components();
            let (Some(first), Some(_)) = (components.next(), components.next()) else {
                continue;
            };
            if let Some(name) = first.as_os_str().to_str() {
                if !exclude.contains(&name) {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

impl std::fmt::Debug for InMemoryFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFileStore")
            .field("file_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> InMemoryFileStore {
        let store = InMemoryFileStore::new();
        for path in [
            "/data/units/u1.json",
            "/data/units/u2.json",
            "/data/units/notes.txt",
            "/data/items/sword.json",
            "/data/.backups/files/x.json",
            "/data/patches.json",
        ] {
            store.write_json(Path::new(path), &json!({})).unwrap();
        }
        store
    }

    #[test]
    fn write_and_read() {
        let store = InMemoryFileStore::new();
        let path = Path::new("/d/a.json");
        store.write_json(path, &json!({"hp": 1})).unwrap();
        assert!(store.exists(path));
        assert_eq!(store.read_json(path).unwrap(), json!({"hp": 1}));
    }

    #[test]
    fn read_missing_is_not_found() {
        let store = InMemoryFileStore::new();
        let err = store.read_json(Path::new("/d/missing.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = InMemoryFileStore::new();
        let path = Path::new("/d/a.json");
        store.write_json(path, &json!(1)).unwrap();
        store.delete_file(path).unwrap();
        store.delete_file(path).unwrap();
        assert!(!store.exists(path));
    }

    #[test]
    fn list_files_filters_by_extension() {
        let store = seeded();
        let names = store.list_files(Path::new("/data/units"), &["json"]).unwrap();
        assert_eq!(names, vec!["u1.json", "u2.json"]);
    }

    #[test]
    fn list_directories_excludes_names() {
        let store = seeded();
        let dirs = store
            .list_directories(Path::new("/data"), &[".backups"])
            .unwrap();
        assert_eq!(dirs, vec!["items", "units"]);
    }

    #[test]
    fn failing_writes_leave_state_untouched() {
        let store = InMemoryFileStore::new();
        let path = Path::new("/d/a.json");
        store.write_json(path, &json!(1)).unwrap();
        store.fail_writes(true);
        assert!(matches!(
            store.write_json(path, &json!(2)),
            Err(StoreError::WriteRejected(_))
        ));
        assert!(store.delete_file(path).is_err());
        assert_eq!(store.get(path), Some(json!(1)));
    }

    #[test]
    fn debug_format() {
        let store = seeded();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryFileStore"));
        assert!(debug.contains("file_count"));
    }
}
