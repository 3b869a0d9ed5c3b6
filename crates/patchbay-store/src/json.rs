//! Typed helpers over [`FileStore`].

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::traits::FileStore;

/// Read and deserialize a document, failing if it is missing.
pub fn read_typed<T: DeserializeOwned>(store: &dyn FileStore, path: &Path) -> StoreResult<T> {
    let value = store.read_json(path)?;
    serde_json::from_value(value).map_err(|e| StoreError::serialization(path, e))
}

/// Read and deserialize a document, returning `None` if it is missing.
pub fn read_optional<T: DeserializeOwned>(
    store: &dyn FileStore,
    path: &Path,
) -> StoreResult<Option<T>> {
    match read_typed(store, path) {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Serialize and atomically write a document.
///
/// The value goes through `serde_json::Value` first so that object keys are
/// written in sorted order.
pub fn write_typed<T: Serialize>(store: &dyn FileStore, path: &Path, value: &T) -> StoreResult<()> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::serialization(path, e))?;
    store.write_json(path, &value)
}
