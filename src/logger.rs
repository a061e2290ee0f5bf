//! Logger collaborator
//!
//! The recorder reports unclosed blocks through a [`ProfileLogger`], and the
//! log-sink target forwards completed blocks through one. The default
//! implementation emits `tracing` events; [`MemoryLogger`] keeps records in
//! memory for embedders that want to inspect them.

use crate::message::Context;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::Level;

/// Structured logging sink with a single `log` operation
pub trait ProfileLogger {
    fn log(&self, level: Level, message: &str, context: &Context);
}

/// Forwards records to the `tracing` dispatcher
///
/// The context is rendered as a JSON object in the `context` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ProfileLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, context: &Context) {
        let context = serde_json::to_string(context).unwrap_or_default();

        // tracing needs the level at compile time
        if level == Level::ERROR {
            tracing::error!(target: "blockprof", context = %context, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "blockprof", context = %context, "{}", message);
        } else if level == Level::INFO {
            tracing::info!(target: "blockprof", context = %context, "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(target: "blockprof", context = %context, "{}", message);
        } else {
            tracing::trace!(target: "blockprof", context = %context, "{}", message);
        }
    }
}

/// A single captured log record
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub context: Context,
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Records at the given level
    pub fn records_at(&self, level: Level) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Records survive a poisoned lock
    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileLogger for MemoryLogger {
    fn log(&self, level: Level, message: &str, context: &Context) {
        self.lock().push(LogRecord {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }
}
