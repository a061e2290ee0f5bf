//! Profiler configuration
//!
//! Loaded from TOML. Targets are either a table of named entries (kept in
//! file order) or an array of positional ones:
//!
//! ```toml
//! enabled = true
//!
//! [targets.log]
//! kind = "log"
//! level = "debug"
//!
//! [targets.file]
//! kind = "file"
//! filename = "runtime/profiling/{date}-{time}.txt"
//! dir_mode = 0o775
//! exclude = ["noise.*"]
//! ```

use crate::error::Result as ProfilerResult;
use crate::logger::ProfileLogger;
use crate::recorder::Recorder;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn default_true() -> bool {
    true
}

fn default_targets() -> Value {
    json!({ "log": { "kind": "log", "level": "info" } })
}

/// Recorder settings plus raw target definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilerConfig {
    /// Whether the recorder starts enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Target definitions, validated when the recorder is built
    #[serde(default = "default_targets")]
    pub targets: Value,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            targets: default_targets(),
        }
    }
}

impl ProfilerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid profiler configuration")
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("Profiler configuration file not found: {}", path.display());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Validate the targets and build a recorder
    pub fn build_recorder(&self, logger: Arc<dyn ProfileLogger>) -> ProfilerResult<Recorder> {
        let recorder = Recorder::from_definitions(logger, &self.targets)?;
        Ok(recorder.enable(self.enabled))
    }
}
