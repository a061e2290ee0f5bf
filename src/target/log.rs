//! Log-sink target: forwards each completed block to a structured logger

use super::{Target, TargetBuilder, TargetSettings};
use crate::error::Result;
use crate::logger::ProfileLogger;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Writes every message's token and context to a [`ProfileLogger`]
#[derive(Clone)]
pub struct LogTarget {
    name: String,
    logger: Arc<dyn ProfileLogger>,
    level: Level,
    settings: TargetSettings,
}

impl LogTarget {
    /// Log at `DEBUG`
    pub fn new(logger: Arc<dyn ProfileLogger>) -> Self {
        Self::with_level(logger, Level::DEBUG)
    }

    pub fn with_level(logger: Arc<dyn ProfileLogger>, level: Level) -> Self {
        Self {
            name: "log".to_string(),
            logger,
            level,
            settings: TargetSettings::default(),
        }
    }

    /// Name reported in diagnostics (default: `log`)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl fmt::Debug for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTarget")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Target for LogTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &TargetSettings {
        &self.settings
    }

    fn export(&self, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.logger.log(self.level, message.token(), message.context());
        }
        Ok(())
    }
}

impl TargetBuilder for LogTarget {
    fn settings_mut(&mut self) -> &mut TargetSettings {
        &mut self.settings
    }
}
