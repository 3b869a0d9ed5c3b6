use serde::{Deserialize, Serialize};

/// Configuration for the change gate pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Stop at the first failing stage instead of collecting the issues of
    /// every stage.
    pub fail_fast: bool,
}
