//! Profiling message data model
//!
//! A [`Message`] is one profiling event, either pending (begun, not ended)
//! or completed. The recorder owns the reserved context keys; everything
//! else in the context bag is caller data carried through untouched.

use serde_json::{Map, Value};

/// Ordered context bag attached to every message
pub type Context = Map<String, Value>;

/// Category used when the caller does not supply one
pub const DEFAULT_CATEGORY: &str = "application";

/// Reserved context keys written by the recorder
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const CATEGORY: &str = "category";
    pub const NESTED_LEVEL: &str = "nestedLevel";
    pub const TIME: &str = "time";
    pub const BEGIN_TIME: &str = "beginTime";
    pub const BEGIN_MEMORY: &str = "beginMemory";
    pub const END_TIME: &str = "endTime";
    pub const END_MEMORY: &str = "endMemory";
    pub const DURATION: &str = "duration";
    pub const MEMORY_DIFF: &str = "memoryDiff";
}

/// One profiling event plus its context bag
///
/// Fields are private: once built, a message never changes. Merging the
/// end-of-block readings produces a new message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    category: String,
    token: String,
    context: Context,
}

impl Message {
    /// Create a message for `category` / `token` with the given context
    pub fn new(category: impl Into<String>, token: impl Into<String>, context: Context) -> Self {
        Self {
            category: category.into(),
            token: token.into(),
            context,
        }
    }

    /// Logical grouping key used for filtering
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Name of the measured block
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Full context bag
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Single context value by name
    pub fn context_value(&self, name: &str) -> Option<&Value> {
        self.context.get(name)
    }

    pub fn begin_time(&self) -> Option<f64> {
        self.float(keys::BEGIN_TIME)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.float(keys::END_TIME)
    }

    /// Block duration in seconds (completed messages only)
    pub fn duration(&self) -> Option<f64> {
        self.float(keys::DURATION)
    }

    /// Memory delta in bytes (completed messages only)
    pub fn memory_diff(&self) -> Option<i64> {
        self.context.get(keys::MEMORY_DIFF).and_then(Value::as_i64)
    }

    pub fn nested_level(&self) -> Option<u64> {
        self.context.get(keys::NESTED_LEVEL).and_then(Value::as_u64)
    }

    fn float(&self, name: &str) -> Option<f64> {
        self.context.get(name).and_then(Value::as_f64)
    }
}

/// Human-readable type name of a context or configuration value
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test context must be an object"),
        }
    }

    #[test]
    fn test_message_accessors() {
        let message = Message::new(
            "db",
            "query",
            context(json!({"beginTime": 100.0, "endTime": 100.25, "duration": 0.25, "memoryDiff": -16, "nestedLevel": 2})),
        );

        assert_eq!(message.category(), "db");
        assert_eq!(message.token(), "query");
        assert_eq!(message.begin_time(), Some(100.0));
        assert_eq!(message.end_time(), Some(100.25));
        assert_eq!(message.duration(), Some(0.25));
        assert_eq!(message.memory_diff(), Some(-16));
        assert_eq!(message.nested_level(), Some(2));
    }

    #[test]
    fn test_pending_message_has_no_duration() {
        let message = Message::new(DEFAULT_CATEGORY, "t", Context::new());
        assert!(message.duration().is_none());
        assert!(message.context_value("missing").is_none());
    }

    #[test]
    fn test_context_keeps_insertion_order() {
        let mut ctx = Context::new();
        ctx.insert("zeta".into(), json!(1));
        ctx.insert("alpha".into(), json!(2));
        let message = Message::new("c", "t", ctx);

        let keys: Vec<_> = message.context().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "bool");
        assert_eq!(value_type_name(&json!(3)), "int");
        assert_eq!(value_type_name(&json!(3.5)), "float");
        assert_eq!(value_type_name(&json!("s")), "string");
        assert_eq!(value_type_name(&json!([1])), "array");
        assert_eq!(value_type_name(&json!({"a": 1})), "table");
    }
}
