use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use patchbay_gate::GateConfig;
use patchbay_store::{DEFAULT_BACKUP_DIR, DEFAULT_RETENTION};

use crate::error::{RolloutError, RolloutResult};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "patchbay.toml";

/// Configuration for a data directory under patchbay control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Root of the managed documents.
    pub data_dir: PathBuf,
    /// Published patch list, relative to `data_dir`.
    pub patches_file: String,
    /// Pending-change queue, relative to `data_dir`.
    pub queue_file: String,
    /// Registered entity categories. Empty means every directory in
    /// `data_dir` except `excluded_dirs`.
    pub categories: Vec<String>,
    pub excluded_dirs: Vec<String>,
    /// Derived files (relative to `data_dir`) that are included in
    /// source-control commits when they exist.
    pub published_files: Vec<String>,
    pub backup_dir: String,
    pub backup_retention: usize,
    /// Validation pipeline settings (`[gate]` table).
    pub gate: GateConfig,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            patches_file: "patches.json".into(),
            queue_file: "queue.json".into(),
            categories: Vec::new(),
            excluded_dirs: vec![DEFAULT_BACKUP_DIR.into(), ".git".into()],
            published_files: Vec::new(),
            backup_dir: DEFAULT_BACKUP_DIR.into(),
            backup_retention: DEFAULT_RETENTION,
            gate: GateConfig::default(),
        }
    }
}

impl RolloutConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> RolloutResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file. A relative `data_dir` is resolved against
    /// the directory containing the file.
    pub fn load(path: &Path) -> RolloutResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RolloutError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        Ok(config)
    }

    pub fn patches_path(&self) -> PathBuf {
        self.data_dir.join(&self.patches_file)
    }

    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join(&self.queue_file)
    }
}
