//! Target definitions from configuration values
//!
//! Dynamic target lists (TOML files, JSON blobs) are validated here, once,
//! before a recorder is built. Every entry must be a table with a `kind`;
//! anything else is rejected with the entry's name or position and the
//! actual value type.

use super::file::DEFAULT_DIR_MODE;
use super::{FileTarget, LogTarget, Target, TargetBuilder};
use crate::error::{ProfilerError, Result};
use crate::logger::ProfileLogger;
use crate::message::value_type_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Level;

/// Kinds of built-in targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Forward to the logger collaborator
    Log,
    /// Write a report file
    File,
}

fn default_true() -> bool {
    true
}

/// One validated target entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDefinition {
    pub kind: TargetKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Categories to keep (empty = all)
    #[serde(default)]
    pub include: Vec<String>,

    /// Categories to drop
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Log level for `log` targets (default: debug)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Output path template for `file` targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Directory permissions for `file` targets (default: 0o775)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_mode: Option<u32>,
}

impl TargetDefinition {
    /// Validate a raw entry called `name` (key or position)
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ProfilerError::invalid(format!(
                "Target \"{}\" should be a target definition table, \"{}\" given.",
                name,
                value_type_name(value)
            )));
        }

        serde_json::from_value(value.clone()).map_err(|e| {
            ProfilerError::invalid(format!(
                "Target \"{}\" is not a valid target definition: {}",
                name, e
            ))
        })
    }

    /// Build the configured target
    pub fn build(&self, name: &str, logger: &Arc<dyn ProfileLogger>) -> Result<Box<dyn Target>> {
        let target: Box<dyn Target> = match self.kind {
            TargetKind::Log => {
                let level = match &self.level {
                    Some(level) => level.parse::<Level>().map_err(|_| {
                        ProfilerError::invalid(format!(
                            "Target \"{}\" has an unknown log level \"{}\".",
                            name, level
                        ))
                    })?,
                    None => Level::DEBUG,
                };
                Box::new(
                    LogTarget::with_level(Arc::clone(logger), level)
                        .with_name(name)
                        .enable(self.enabled)
                        .include(&self.include)
                        .exclude(&self.exclude),
                )
            }
            TargetKind::File => {
                let filename = self.filename.as_deref().ok_or_else(|| {
                    ProfilerError::invalid(format!(
                        "Target \"{}\" of kind \"file\" requires a \"filename\".",
                        name
                    ))
                })?;
                Box::new(
                    FileTarget::new(filename)
                        .with_name(name)
                        .with_dir_mode(self.dir_mode.unwrap_or(DEFAULT_DIR_MODE))
                        .enable(self.enabled)
                        .include(&self.include)
                        .exclude(&self.exclude),
                )
            }
        };
        Ok(target)
    }
}

/// Validate and build a whole target list
///
/// `entries` is either a table of named entries or an array of positional
/// ones; registration order follows the entry order. Validation of every
/// entry happens before any target is built.
pub fn build_targets(entries: &Value, logger: &Arc<dyn ProfileLogger>) -> Result<Vec<Box<dyn Target>>> {
    let named: Vec<(String, &Value)> = match entries {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            return Err(ProfilerError::invalid(format!(
                "Targets should be a table or an array, \"{}\" given.",
                value_type_name(other)
            )))
        }
    };

    let definitions = named
        .iter()
        .map(|(name, value)| TargetDefinition::from_value(name, value).map(|d| (name, d)))
        .collect::<Result<Vec<_>>>()?;

    definitions
        .iter()
        .map(|(name, definition)| definition.build(name, logger))
        .collect()
}
