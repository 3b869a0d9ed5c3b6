//! Error types for the queue crate.

use patchbay_types::ErrorKind;

/// Errors that can occur during queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No queued change at the given position.
    #[error("queue index {index} out of range (queue has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A bulk removal was requested without any index.
    #[error("no queue indices given")]
    EmptyIndexList,

    /// The change failed validation.
    #[error(transparent)]
    Invalid(#[from] patchbay_gate::GateError),

    /// The change's field is not a valid path.
    #[error(transparent)]
    Field(#[from] patchbay_diff::DiffError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] patchbay_store::StoreError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfRange { .. } => ErrorKind::NotFound,
            Self::EmptyIndexList => ErrorKind::BadRequest,
            Self::Invalid(e) => e.kind(),
            Self::Field(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

/// Convenience alias for queue results.
pub type QueueResult<T> = Result<T, QueueError>;
