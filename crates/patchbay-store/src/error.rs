use std::path::PathBuf;

use patchbay_types::ErrorKind;

/// Errors from file and backup store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Serialization or deserialization failure.
    #[error("serialization error in {}: {reason}", .path.display())]
    Serialization { path: PathBuf, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the write (read-only or failing double).
    #[error("write rejected for {}", .0.display())]
    WriteRejected(PathBuf),

    /// A backup could not be taken.
    #[error("backup failed: {0}")]
    Backup(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Serialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
