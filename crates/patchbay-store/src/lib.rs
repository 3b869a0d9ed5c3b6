//! Storage capabilities for patchbay.
//!
//! The patch and queue logic never touches the filesystem directly. It goes
//! through two capabilities defined here:
//!
//! - [`FileStore`] -- read, write (atomically), delete and list JSON documents
//! - [`BackupStore`] -- per-file, queue and full-tree backups with rotation
//!
//! # Backends
//!
//! - [`InMemoryFileStore`] / [`InMemoryBackupStore`] -- in-memory doubles for
//!   tests and embedding
//! - [`LocalFileStore`] / [`LocalBackupStore`] -- local disk
//!
//! # Design Rules
//!
//! 1. Every document write is atomic: temp file in the target directory, then rename.
//! 2. Documents are written pretty-printed with sorted object keys.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod backup;
pub mod error;
pub mod json;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use backup::{
    BackupRecord, InMemoryBackupStore, LocalBackupStore, DEFAULT_BACKUP_DIR, DEFAULT_RETENTION,
};
pub use error::{StoreError, StoreResult};
pub use json::{read_optional, read_typed, write_typed};
pub use local::LocalFileStore;
pub use memory::InMemoryFileStore;
pub use traits::{BackupStore, FileStore};
