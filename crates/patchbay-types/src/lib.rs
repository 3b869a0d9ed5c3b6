//! Foundation types for patchbay.
//!
//! This crate provides the data model shared by every other patchbay crate:
//! structural diff entries, the two change representations (queued snapshot
//! vs. published slim diff), and published patches. It performs no I/O.
//!
//! # Key Types
//!
//! - [`DiffEntry`] / [`ArrayItem`] -- One typed path operation of a slim diff
//! - [`PathStep`] -- A string key or integer index locating a value in a document
//! - [`SnapshotChange`] -- A pending edit with full before/after documents
//! - [`SlimChange`] -- A published edit reduced to a structural diff
//! - [`Change`] -- Either representation, as stored inside a patch
//! - [`Patch`] -- A published bundle of changes tied to a version string
//! - [`ErrorKind`] -- The BadRequest / NotFound / Internal error taxonomy

pub mod change;
pub mod diff_entry;
pub mod error;
pub mod patch;
pub mod path;

pub use change::{
    upsert_by_key, Change, ChangeKey, ChangeType, Keyed, SlimChange, SnapshotChange,
};
pub use diff_entry::{ArrayItem, DiffEntry};
pub use error::{ErrorKind, FieldIssue, TypeError};
pub use patch::{Patch, PatchType};
pub use path::{
    entity_file_name, field_path, format_path, is_root_field, target_matches, PathStep, ROOT_FIELD,
};
