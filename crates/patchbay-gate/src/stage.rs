use std::time::Duration;

use serde_json::Value;

use patchbay_types::{FieldIssue, SlimChange, SnapshotChange};

use crate::error::GateError;

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// Something submitted to the gate for validation.
#[derive(Clone, Copy, Debug)]
pub enum Candidate<'a> {
    /// A pending change about to enter the queue.
    Snapshot(&'a SnapshotChange),
    /// A published change about to be recorded in a patch.
    Slim(&'a SlimChange),
    /// A whole document about to be written for `category`.
    Document { category: &'a str, value: &'a Value },
}

impl<'a> Candidate<'a> {
    /// Category the candidate belongs to.
    pub fn category(&self) -> &'a str {
        match *self {
            Self::Snapshot(c) => &c.category,
            Self::Slim(c) => &c.category,
            Self::Document { category, .. } => category,
        }
    }
}

impl<'a> From<&'a SnapshotChange> for Candidate<'a> {
    fn from(change: &'a SnapshotChange) -> Self {
        Self::Snapshot(change)
    }
}

impl<'a> From<&'a SlimChange> for Candidate<'a> {
    fn from(change: &'a SlimChange) -> Self {
        Self::Slim(change)
    }
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage found problems with the candidate.
    Fail { issues: Vec<FieldIssue> },
}

impl StageDecision {
    /// `Pass` when `issues` is empty, `Fail` otherwise.
    pub fn from_issues(issues: Vec<FieldIssue>) -> Self {
        if issues.is_empty() {
            Self::Pass
        } else {
            Self::Fail { issues }
        }
    }

    /// Returns `true` if the decision is `Pass`.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns `true` if the decision is `Fail`.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    /// Name of the stage that produced this result.
    pub stage_name: String,
    /// Whether the stage passed.
    pub passed: bool,
    /// Issues reported by the stage (empty when it passed).
    pub issues: Vec<FieldIssue>,
    /// Wall-clock time the stage took to evaluate.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the gate pipeline.
///
/// The trait is object-safe and `Send + Sync` so stages can be stored in
/// a `Vec<Box<dyn GateStage>>`.
pub trait GateStage: Send + Sync {
    /// Human-readable name of this stage (e.g., "shape", "schema").
    fn name(&self) -> &str;

    /// Evaluate the candidate and return a decision.
    fn evaluate(&self, candidate: &Candidate<'_>) -> Result<StageDecision, GateError>;
}
