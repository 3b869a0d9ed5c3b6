use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::FileStore;

/// Filesystem-backed document store.
///
/// Documents are pretty-printed JSON. Writes go to a temporary file in the
/// destination directory and are renamed into place, so readers never see a
/// partially written document.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

fn entries(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_json(&self, path: &Path) -> StoreResult<Value> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::serialization(path, e))
    }

    fn write_json(&self, path: &Path, value: &Value) -> StoreResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, value)
            .map_err(|e| StoreError::serialization(path, e))?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), "wrote document");
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> StoreResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted document");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_files(&self, dir: &Path, extensions: &[&str]) -> StoreResult<Vec<String>> {
        let names = entries(dir)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
            })
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        Ok(names)
    }

    fn list_directories(&self, dir: &Path, exclude: &[&str]) -> StoreResult<Vec<String>> {
        let names = entries(dir)
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !exclude.contains(&name.as_str()))
            .collect();
        Ok(names)
    }
}
