use patchbay_types::ErrorKind;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("patch not found: {0}")]
    PatchNotFound(String),

    #[error("No queued changes to commit")]
    NothingToCommit,

    #[error(transparent)]
    Invalid(#[from] patchbay_gate::GateError),

    #[error(transparent)]
    Diff(#[from] patchbay_diff::DiffError),

    #[error(transparent)]
    Queue(#[from] patchbay_queue::QueueError),

    #[error("store error: {0}")]
    Store(#[from] patchbay_store::StoreError),

    #[error("source control error: {0}")]
    SourceControl(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PatchNotFound(_) => ErrorKind::NotFound,
            Self::NothingToCommit => ErrorKind::BadRequest,
            Self::Invalid(e) => e.kind(),
            Self::Diff(e) => e.kind(),
            Self::Queue(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::SourceControl(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;
