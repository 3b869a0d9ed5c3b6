//! High-level SDK for patchbay.
//!
//! [`RolloutCoordinator`] is the main entry point for applications embedding
//! patchbay. It ties the change queue, the patch ledger, the validation gate
//! and the backup and source-control capabilities together so that every
//! edit is validated, backed up and recorded in the same order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use patchbay_sdk::{PatchMeta, RolloutConfig, RolloutCoordinator, SaveMode};
//! use patchbay_types::PatchType;
//! use serde_json::json;
//!
//! # fn main() -> patchbay_sdk::RolloutResult<()> {
//! let rollout = RolloutCoordinator::local(RolloutConfig::for_data_dir("data"));
//! rollout.save_entity("units", "u1.json", "stats.hp", json!(20), SaveMode::Queue)?;
//! let patch = rollout.commit(PatchMeta::new("Balance pass", "1.0.1", PatchType::Patch))?;
//! rollout.rollback(&patch.id)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{RolloutConfig, CONFIG_FILE};
pub use coordinator::{RolloutCoordinator, SaveMode, SaveOutcome};
pub use error::{RolloutError, RolloutResult};

// Re-export key types
pub use patchbay_gate::{RequiredKeysSchema, Schema, StaticValidator, Validator};
pub use patchbay_ledger::{NoopSourceControl, PatchMeta, RecordingSourceControl, SourceControl};
pub use patchbay_store::{BackupStore, FileStore, LocalBackupStore, LocalFileStore};
pub use patchbay_types::{Change, ChangeType, Patch, PatchType, SlimChange, SnapshotChange};
