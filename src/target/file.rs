//! File target: writes each flushed batch as a plain-text report
//!
//! The filename may contain placeholders resolved at export time:
//! - `{ts}` - Unix timestamp
//! - `{date}` - UTC date as `yymmdd`
//! - `{time}` - UTC time as `HHMMSS`
//!
//! Unknown placeholders are left as written. Missing parent directories are
//! created; an existing file is overwritten.

use super::{Target, TargetBuilder, TargetSettings};
use crate::error::{ProfilerError, Result};
use crate::message::Message;
use crate::probe::{peak_memory_usage, unix_time};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default permissions for created directories
pub const DEFAULT_DIR_MODE: u32 = 0o775;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\w+\}").expect("valid placeholder regex"))
}

/// Records profiling messages in a text file
#[derive(Debug, Clone)]
pub struct FileTarget {
    name: String,
    filename: String,
    dir_mode: u32,
    start_time: f64,
    settings: TargetSettings,
}

impl FileTarget {
    /// Target writing to `filename`; processing time is measured from now
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            name: "file".to_string(),
            filename: filename.into(),
            dir_mode: DEFAULT_DIR_MODE,
            start_time: unix_time(),
            settings: TargetSettings::default(),
        }
    }

    /// Name reported in diagnostics (default: `file`)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Permissions for directories created on export
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Unix timestamp the reported processing time is measured from
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn dir_mode(&self) -> u32 {
        self.dir_mode
    }

    /// Resolve placeholders against the current UTC time
    pub fn resolve_filename(&self) -> PathBuf {
        self.resolve_filename_at(Utc::now())
    }

    /// Resolve placeholders against a fixed instant
    pub fn resolve_filename_at(&self, now: DateTime<Utc>) -> PathBuf {
        let resolved = placeholder_regex().replace_all(&self.filename, |caps: &Captures| {
            match &caps[0] {
                "{ts}" => now.timestamp().to_string(),
                "{date}" => now.format("%y%m%d").to_string(),
                "{time}" => now.format("%H%M%S").to_string(),
                other => other.to_string(),
            }
        });
        PathBuf::from(resolved.into_owned())
    }

    /// Render the report for a batch
    pub fn render(&self, messages: &[Message], now: f64, peak_memory: i64) -> String {
        let total_ms = (now - self.start_time) * 1000.0;
        let mut text = format!(
            "Total processing time: {:.3} ms; Peak memory: {} B.\n\n",
            total_ms, peak_memory
        );

        let lines: Vec<String> = messages.iter().map(format_message).collect();
        text.push_str(&lines.join("\n"));
        text.push('\n');
        text
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => DirBuilder::new()
                .recursive(true)
                .mode(self.dir_mode)
                .create(dir),
            _ => Ok(()),
        }
    }

    fn export_error(&self, path: &Path, source: io::Error) -> ProfilerError {
        ProfilerError::Export {
            target: self.name.clone(),
            source: io::Error::new(source.kind(), format!("{}: {}", path.display(), source)),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS [<duration> ms][<memoryDiff> B][<category>] <token>`
fn format_message(message: &Message) -> String {
    let begin = message.begin_time().unwrap_or_default();
    let stamp = DateTime::<Utc>::from_timestamp(begin.floor() as i64, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S");
    let duration_ms = message.duration().unwrap_or_default() * 1000.0;

    format!(
        "{} [{:.3} ms][{} B][{}] {}",
        stamp,
        duration_ms,
        message.memory_diff().unwrap_or_default(),
        message.category(),
        message.token()
    )
}

impl Target for FileTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &TargetSettings {
        &self.settings
    }

    fn export(&self, messages: &[Message]) -> Result<()> {
        let text = self.render(messages, unix_time(), peak_memory_usage());
        let path = self.resolve_filename();

        self.ensure_parent(&path)
            .map_err(|e| self.export_error(&path, e))?;
        fs::write(&path, text).map_err(|e| self.export_error(&path, e))?;

        tracing::debug!("Wrote {} profiling messages to {}", messages.len(), path.display());
        Ok(())
    }
}

impl TargetBuilder for FileTarget {
    fn settings_mut(&mut self) -> &mut TargetSettings {
        &mut self.settings
    }
}
