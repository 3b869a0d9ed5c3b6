//! Error types for the diff crate.

use patchbay_types::{ErrorKind, TypeError};

/// Errors that can occur while slimming a change.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The change's field is not a valid dotted path.
    #[error("invalid field: {0}")]
    InvalidField(#[from] TypeError),
}

impl DiffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidField(_) => ErrorKind::BadRequest,
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
