use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid field path: {0}")]
    InvalidFieldPath(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification shared by every patchbay error type.
///
/// Front ends map these onto their own status codes (400 / 404 / 500).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The caller supplied something invalid (bad change shape, empty
    /// commit, out-of-range queue index).
    BadRequest,
    /// A patch, queue item or entity file does not exist.
    NotFound,
    /// Backup, filesystem or serialization failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad request"),
            Self::NotFound => write!(f, "not found"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// One offending field reported by validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted path of the offending field (e.g. `changes.2.target_id`).
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Prefix the path with a parent segment.
    pub fn nested(mut self, parent: &str) -> Self {
        self.path = if self.path.is_empty() {
            parent.to_string()
        } else {
            format!("{parent}.{}", self.path)
        };
        self
    }

    /// Render a list of issues as a single `path: message; ...` line.
    pub fn summarize(issues: &[FieldIssue]) -> String {
        issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
