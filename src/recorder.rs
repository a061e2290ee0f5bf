//! Profiling recorder: begin/end matching, buffering and dispatch
//!
//! Callers bracket work with `begin(token)` / `end(token)`. Each `begin`
//! pushes a pending message onto a per-(category, token) stack; the
//! matching `end` pops the most recent one, merges the end readings and
//! appends the completed message to the buffer. `flush` reports blocks that
//! were never closed, then hands the completed buffer to every target.
//!
//! The recorder is single-threaded: use one instance per request, job or
//! thread. Nothing here registers process-wide hooks; the host calls
//! [`Recorder::flush`] at teardown.

use crate::error::{ProfilerError, Result};
use crate::logger::{ProfileLogger, TracingLogger};
use crate::message::{keys, value_type_name, Context, Message, DEFAULT_CATEGORY};
use crate::probe::{Probe, SystemProbe};
use crate::target::{build_targets, Target};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Pending stacks: category -> token -> LIFO stack (never empty)
type PendingMessages = BTreeMap<String, BTreeMap<String, Vec<Message>>>;

/// The profiling operations host code depends on
pub trait Profiler {
    /// Mark the beginning of a block; must be matched by `end`
    fn begin(&mut self, token: &str, context: Context) -> Result<()>;

    /// Mark the end of the most recently begun block with this token
    fn end(&mut self, token: &str, context: Context) -> Result<()>;

    /// Completed messages with the given token, in completion order
    fn find_messages(&self, token: &str) -> Vec<&Message>;

    /// Report unclosed blocks and dispatch completed messages to targets
    fn flush(&mut self) -> Result<()>;
}

/// In-memory profiling recorder
pub struct Recorder {
    enabled: bool,
    /// Completed messages awaiting the next flush
    messages: Vec<Message>,
    pending: PendingMessages,
    /// Open-block depth across all categories
    nested_level: usize,
    targets: Vec<Box<dyn Target>>,
    logger: Arc<dyn ProfileLogger>,
    probe: Box<dyn Probe>,
}

impl Recorder {
    /// Create a recorder dispatching to `targets` in the given order
    pub fn new(logger: Arc<dyn ProfileLogger>, targets: Vec<Box<dyn Target>>) -> Self {
        Self {
            enabled: true,
            messages: Vec::new(),
            pending: PendingMessages::new(),
            nested_level: 0,
            targets,
            logger,
            probe: Box::new(SystemProbe::new()),
        }
    }

    /// Create a recorder from raw target definitions
    ///
    /// Every entry is validated before the recorder exists; see
    /// [`build_targets`] for the accepted shapes.
    pub fn from_definitions(logger: Arc<dyn ProfileLogger>, entries: &Value) -> Result<Self> {
        let targets = build_targets(entries, &logger)?;
        Ok(Self::new(logger, targets))
    }

    /// Replace the clock and memory source
    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Enable or disable recording
    ///
    /// While disabled, `begin` and `end` do nothing.
    pub fn enable(mut self, value: bool) -> Self {
        self.enabled = value;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Completed messages not yet flushed
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn targets(&self) -> &[Box<dyn Target>] {
        &self.targets
    }

    /// Current open-block depth
    pub fn nested_level(&self) -> usize {
        self.nested_level
    }

    /// Number of begun-but-not-ended blocks
    pub fn pending_count(&self) -> usize {
        self.pending
            .values()
            .flat_map(|tokens| tokens.values())
            .map(Vec::len)
            .sum()
    }

    pub fn begin(&mut self, token: &str, mut context: Context) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let category = category_from(&context)?;
        let now = self.probe.now();

        context.insert(keys::TOKEN.into(), token.into());
        context.insert(keys::CATEGORY.into(), category.clone().into());
        context.insert(keys::NESTED_LEVEL.into(), self.nested_level.into());
        context.insert(keys::TIME.into(), now.into());
        context.insert(keys::BEGIN_TIME.into(), now.into());
        context.insert(keys::BEGIN_MEMORY.into(), self.probe.memory_usage().into());

        let message = Message::new(category.clone(), token, context);
        self.pending
            .entry(category)
            .or_default()
            .entry(token.to_string())
            .or_default()
            .push(message);
        self.nested_level += 1;

        Ok(())
    }

    pub fn end(&mut self, token: &str, context: Context) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let category = category_from(&context)?;

        let is_open = self
            .pending
            .get(&category)
            .is_some_and(|tokens| tokens.contains_key(token));
        if !is_open {
            return Err(ProfilerError::UnmatchedEnd {
                category,
                token: token.to_string(),
            });
        }

        for key in [keys::BEGIN_TIME, keys::BEGIN_MEMORY] {
            if context.contains_key(key) {
                return Err(ProfilerError::invalid(format!(
                    "It is forbidden to override \"{}\" in context.",
                    key
                )));
            }
        }

        let Some(begun) = self.pop_pending(&category, token) else {
            return Err(ProfilerError::UnmatchedEnd {
                category,
                token: token.to_string(),
            });
        };

        let end_time = self.probe.now();
        let end_memory = self.probe.memory_usage();
        let begin_time = begun.begin_time().unwrap_or(end_time);
        let begin_memory = begun
            .context_value(keys::BEGIN_MEMORY)
            .and_then(Value::as_i64)
            .unwrap_or(end_memory);

        let mut merged = begun.context().clone();
        merged.extend(context);
        merged.insert(keys::END_TIME.into(), end_time.into());
        merged.insert(keys::END_MEMORY.into(), end_memory.into());
        merged.insert(keys::DURATION.into(), (end_time - begin_time).into());
        merged.insert(keys::MEMORY_DIFF.into(), (end_memory - begin_memory).into());

        self.messages
            .push(Message::new(category, begun.token(), merged));
        self.nested_level = self.nested_level.saturating_sub(1);

        Ok(())
    }

    /// Time a closure as one block
    ///
    /// # Example
    /// ```
    /// use blockprof::{Context, Recorder};
    ///
    /// let mut recorder = Recorder::default();
    /// let answer = recorder.measure("compute", Context::new(), || 6 * 7).unwrap();
    /// assert_eq!(answer, 42);
    /// assert_eq!(recorder.find_messages("compute").len(), 1);
    /// ```
    pub fn measure<F, R>(&mut self, token: &str, context: Context, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let mut end_context = Context::new();
        if let Some(category) = context.get(keys::CATEGORY) {
            end_context.insert(keys::CATEGORY.into(), category.clone());
        }

        self.begin(token, context)?;
        let result = f();
        self.end(token, end_context)?;
        Ok(result)
    }

    pub fn find_messages(&self, token: &str) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|message| message.token() == token)
            .collect()
    }

    pub fn flush(&mut self) -> Result<()> {
        for (category, tokens) in &self.pending {
            for token in tokens.keys() {
                self.report_unclosed(category, token);
            }
        }

        self.pending.clear();
        self.nested_level = 0;

        if self.messages.is_empty() {
            return Ok(());
        }

        // Messages recorded while targets export land in a fresh buffer
        let messages = std::mem::take(&mut self.messages);
        self.dispatch(&messages)
    }

    /// Hand a batch to every target in registration order
    ///
    /// A failing target does not stop the others; the first failure is
    /// returned once all targets have run.
    fn dispatch(&self, messages: &[Message]) -> Result<()> {
        tracing::debug!(
            "Dispatching {} profiling messages to {} targets",
            messages.len(),
            self.targets.len()
        );

        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.collect(messages) {
                tracing::error!("Profiling target {} failed: {}", target.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn pop_pending(&mut self, category: &str, token: &str) -> Option<Message> {
        let tokens = self.pending.get_mut(category)?;
        let stack = tokens.get_mut(token)?;
        let message = stack.pop();

        if stack.is_empty() {
            tokens.remove(token);
            if tokens.is_empty() {
                self.pending.remove(category);
            }
        }
        message
    }

    fn report_unclosed(&self, category: &str, token: &str) {
        let mut context = Context::new();
        context.insert(keys::CATEGORY.into(), category.into());
        context.insert(keys::TOKEN.into(), token.into());

        self.logger.log(
            Level::WARN,
            &format!(
                "Unclosed profiling entry detected: category \"{}\" token \"{}\"",
                category, token
            ),
            &context,
        );
    }
}

impl Default for Recorder {
    /// Recorder with no targets, reporting through `tracing`
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger), Vec::new())
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("enabled", &self.enabled)
            .field("messages", &self.messages.len())
            .field("pending", &self.pending_count())
            .field("nested_level", &self.nested_level)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl Profiler for Recorder {
    fn begin(&mut self, token: &str, context: Context) -> Result<()> {
        Recorder::begin(self, token, context)
    }

    fn end(&mut self, token: &str, context: Context) -> Result<()> {
        Recorder::end(self, token, context)
    }

    fn find_messages(&self, token: &str) -> Vec<&Message> {
        Recorder::find_messages(self, token)
    }

    fn flush(&mut self) -> Result<()> {
        Recorder::flush(self)
    }
}

/// Category from the caller context, `"application"` when absent
fn category_from(context: &Context) -> Result<String> {
    match context.get(keys::CATEGORY) {
        None => Ok(DEFAULT_CATEGORY.to_string()),
        Some(Value::String(category)) => Ok(category.clone()),
        Some(other) => Err(ProfilerError::invalid(format!(
            "Category should be a string, \"{}\" given.",
            value_type_name(other)
        ))),
    }
}
