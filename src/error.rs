//! Error taxonomy for the profiler core
//!
//! Malformed caller input and protocol violations are surfaced synchronously
//! to the caller. Unclosed blocks at flush time are not errors; they are
//! reported through the logger collaborator instead.

use thiserror::Error;

/// Errors raised by the recorder, the targets and target construction
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// Malformed caller input: non-string category, reserved context key
    /// override, or a target definition that is not a target
    #[error("{0}")]
    InvalidInput(String),

    /// `end()` was called without a matching open `begin()`
    #[error(
        "Unexpected Recorder::end() call for category \"{category}\" token \"{token}\". A matching begin() was not found."
    )]
    UnmatchedEnd { category: String, token: String },

    /// A target failed to deliver its batch
    #[error("Target \"{target}\" failed to export profiling messages: {source}")]
    Export {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProfilerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ProfilerError::InvalidInput(message.into())
    }

    /// Whether this error is a caller input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ProfilerError::InvalidInput(_))
    }

    /// Whether this error is a begin/end protocol violation
    pub fn is_runtime_fault(&self) -> bool {
        matches!(self, ProfilerError::UnmatchedEnd { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
