use patchbay_types::{ErrorKind, FieldIssue};

/// Errors that can occur during gate evaluation.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The candidate failed validation. Every offending field is listed.
    #[error("validation failed: {}", FieldIssue::summarize(.issues))]
    Invalid { issues: Vec<FieldIssue> },

    /// A stage could not run.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },
}

impl GateError {
    /// Create a stage error with a name and message.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid { .. } => ErrorKind::BadRequest,
            Self::StageError { .. } => ErrorKind::Internal,
        }
    }

    /// The field issues carried by an `Invalid` error.
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Invalid { issues } => issues,
            Self::StageError { .. } => &[],
        }
    }
}

/// Result alias for gate operations.
pub type GateOutcome<T> = Result<T, GateError>;
