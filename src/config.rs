//! Worker configuration.
//!
//! Sent by the coordinator with the handshake, or read from a TOML file:
//!
//! ```toml
//! debug = true
//! timeoutMs = 500
//! bufferSlots = 1024
//! classifier = "lookahead"
//! ```
//!
//! Every key is optional. A file leaves unset keys at their defaults; a
//! [`ConfigPatch`] sent to a running worker only changes the keys it names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::{DEFAULT_BUFFER_SLOTS, DEFAULT_TIMEOUT};
use crate::runner::capability::classifier::ClassifierMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    /// Emit per-access debug records.
    pub debug: bool,
    pub timeout_ms: u64,
    pub buffer_slots: usize,
    pub classifier: ClassifierMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            debug: false,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            buffer_slots: DEFAULT_BUFFER_SLOTS,
            classifier: ClassifierMode::default(),
        }
    }
}

/// A partial [`WorkerConfig`] as it arrives in a `workerConfig` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub debug: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub buffer_slots: Option<usize>,
    pub classifier: Option<ClassifierMode>,
}

impl From<WorkerConfig> for ConfigPatch {
    fn from(config: WorkerConfig) -> Self {
        ConfigPatch {
            debug: Some(config.debug),
            timeout_ms: Some(config.timeout_ms),
            buffer_slots: Some(config.buffer_slots),
            classifier: Some(config.classifier),
        }
    }
}

impl WorkerConfig {
    /// Overwrites the keys `patch` names and keeps the rest.
    pub fn merge(&mut self, patch: &ConfigPatch) {
        if let Some(debug) = patch.debug {
            self.debug = debug;
        }
        if let Some(timeout_ms) = patch.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(buffer_slots) = patch.buffer_slots {
            self.buffer_slots = buffer_slots;
        }
        if let Some(classifier) = patch.classifier {
            self.classifier = classifier;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        WorkerConfig::from_toml_str(&text)
    }
}
