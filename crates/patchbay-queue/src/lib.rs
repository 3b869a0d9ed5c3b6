//! Pending-change queue for patchbay.
//!
//! Edits that are not published immediately wait here as snapshot changes
//! (full before/after copies) until a commit turns them into a patch.
//!
//! # Key Types
//!
//! - [`ChangeQueue`] -- The queue, persisted as one JSON document
//! - [`QueueError`] -- Index, validation and storage failures

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::ChangeQueue;
