//! Export targets
//!
//! A target receives every flushed batch, keeps the messages whose category
//! passes its [`CategoryFilter`], and exports the survivors somewhere. The
//! filtering and the enabled switch live in [`TargetSettings`]; concrete
//! targets only implement [`Target::export`].
//!
//! Targets are configured by value: builder methods consume the target and
//! return the reconfigured copy, so cloning a base target and narrowing the
//! clone never affects the original.

mod definition;
mod file;
mod log;

pub use definition::{build_targets, TargetDefinition, TargetKind};
pub use file::FileTarget;
pub use log::LogTarget;

use crate::error::Result;
use crate::filter::CategoryFilter;
use crate::message::Message;
use std::fmt;

/// Enabled flag plus category filter, shared by every target
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSettings {
    enabled: bool,
    filter: CategoryFilter,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: CategoryFilter::all(),
        }
    }
}

impl TargetSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }
}

/// Capability contract for an export destination
pub trait Target: fmt::Debug {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    fn settings(&self) -> &TargetSettings;

    /// Deliver an already filtered, non-empty batch
    fn export(&self, messages: &[Message]) -> Result<()>;

    fn is_enabled(&self) -> bool {
        self.settings().is_enabled()
    }

    fn filter(&self) -> &CategoryFilter {
        self.settings().filter()
    }

    /// Filter a flushed batch by category and export what is left
    fn collect(&self, messages: &[Message]) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let messages = self.filter().filter(messages);
        if messages.is_empty() {
            return Ok(());
        }

        tracing::debug!("Target {} exporting {} messages", self.name(), messages.len());
        self.export(&messages)
    }
}

/// Value-returning configuration shared by the concrete targets
pub trait TargetBuilder: Sized {
    fn settings_mut(&mut self) -> &mut TargetSettings;

    /// Enable or disable the target
    fn enable(mut self, value: bool) -> Self {
        self.settings_mut().enabled = value;
        self
    }

    /// Categories this target is interested in; empty means all
    ///
    /// A trailing `*` matches every category sharing the prefix, e.g.
    /// `db.*` matches `db.connection`.
    fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let settings = self.settings_mut();
        settings.filter = settings.filter.with_include(patterns);
        self
    }

    /// Categories this target ignores; takes precedence over `include`
    fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let settings = self.settings_mut();
        settings.filter = settings.filter.with_exclude(patterns);
        self
    }
}
