//! Change validation for patchbay.
//!
//! Every queued change, every published change and every saved document
//! passes through the gate. The gate runs a pipeline of stages (shape
//! checks, then the category schema) and, unless configured to fail fast,
//! collects the issues of every stage so that a rejection lists every
//! offending field at once.
//!
//! # Quick Start
//!
//! ```rust
//! use patchbay_gate::{ChangeGate, GateConfig};
//! use patchbay_types::SnapshotChange;
//! use serde_json::json;
//!
//! let gate = ChangeGate::with_default_stages(GateConfig::default());
//! let change = SnapshotChange::new("u1.json", "Knight", "units", "entity", None, Some(json!({"hp": 10})));
//! assert!(gate.check(&change).is_ok());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod schema;
pub mod stage;
pub mod stages;

// Re-exports for convenience.
pub use config::GateConfig;
pub use error::{GateError, GateOutcome};
pub use gate::{ChangeGate, GateResult};
pub use schema::{RequiredKeysSchema, SafeParse, Schema, StaticValidator, Validator};
pub use stage::{Candidate, GateStage, StageDecision, StageResult};
pub use stages::{SchemaStage, ShapeStage};
