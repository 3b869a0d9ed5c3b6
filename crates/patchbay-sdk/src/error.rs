use std::path::PathBuf;

use thiserror::Error;

use patchbay_types::ErrorKind;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Gate(#[from] patchbay_gate::GateError),

    #[error(transparent)]
    Diff(#[from] patchbay_diff::DiffError),

    #[error(transparent)]
    Queue(#[from] patchbay_queue::QueueError),

    #[error(transparent)]
    Ledger(#[from] patchbay_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] patchbay_store::StoreError),
}

impl RolloutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound(_) => ErrorKind::NotFound,
            Self::ConfigIo { .. } => ErrorKind::Internal,
            Self::ConfigParse(_) => ErrorKind::BadRequest,
            Self::Gate(e) => e.kind(),
            Self::Diff(e) => e.kind(),
            Self::Queue(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

pub type RolloutResult<T> = Result<T, RolloutError>;
