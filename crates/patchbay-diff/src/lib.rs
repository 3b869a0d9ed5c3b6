//! Diff engine for patchbay.
//!
//! Computes minimal structural diffs between two JSON documents, inverts
//! them, and applies them back onto a document without a stored copy of the
//! state they were computed against.
//!
//! # Key Types
//!
//! - [`ComputedDiff`] -- Change type plus diff entries for an (old, new) pair
//! - [`ApplyOutcome`] / [`ApplyReport`] -- Result of best-effort application
//! - [`DocumentDiff`] / [`DiffHunk`] / [`DiffLine`] -- Line diff of pretty-printed documents
//!
//! Arrays are compared by position only: a reordered array shows up as a
//! series of whole-element edits, never as moves.

pub mod apply;
pub mod compute;
pub mod document_diff;
pub mod error;
pub mod field;

pub use apply::{
    apply_all, apply_change, invert, invert_all, is_blocked_key, revert_change, ApplyOutcome,
    ApplyReport, BLOCKED_KEYS,
};
pub use compute::{compute, diff_values, recursive_diff, slim, ComputedDiff};
pub use document_diff::{diff_documents, DiffHunk, DiffLine, DocumentDiff};
pub use error::{DiffError, DiffResult};
pub use field::{field_value, write_field};
