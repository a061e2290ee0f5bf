// Begin/end protocol of the recorder
//
// - Nesting levels and LIFO matching of same-named blocks
// - Unmatched end, reserved keys and category validation
// - Leak reporting on flush
// - Enable/disable value semantics

use blockprof::{Context, MemoryLogger, Message, ProfilerError, Recorder, ScriptedProbe};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::Level;

fn ctx(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        _ => panic!("test context must be an object"),
    }
}

fn recorder_with_logger() -> (Recorder, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    (Recorder::new(logger.clone(), Vec::new()), logger)
}

fn token_of<'a>(messages: &'a [Message], token: &str) -> &'a Message {
    messages
        .iter()
        .find(|m| m.token() == token)
        .unwrap_or_else(|| panic!("no message for token {token}"))
}

// ============================================================================
// Nesting
// ============================================================================

#[test]
fn test_nested_level() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("outer", Context::new()).unwrap();
    recorder.begin("inner", Context::new()).unwrap();
    recorder.end("inner", Context::new()).unwrap();
    recorder.end("outer", Context::new()).unwrap();
    recorder.begin("not-nested", Context::new()).unwrap();
    recorder.end("not-nested", Context::new()).unwrap();

    let messages = recorder.messages();
    assert_eq!(token_of(messages, "outer").nested_level(), Some(0));
    assert_eq!(token_of(messages, "inner").nested_level(), Some(1));
    assert_eq!(token_of(messages, "not-nested").nested_level(), Some(0));
}

#[test]
fn test_nested_level_is_shared_across_categories() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("request", ctx(json!({"category": "http"}))).unwrap();
    recorder.begin("query", ctx(json!({"category": "db"}))).unwrap();
    recorder.end("query", ctx(json!({"category": "db"}))).unwrap();
    recorder.end("request", ctx(json!({"category": "http"}))).unwrap();

    assert_eq!(recorder.find_messages("query")[0].nested_level(), Some(1));
    assert_eq!(recorder.find_messages("request")[0].nested_level(), Some(0));
}

#[test]
fn test_same_token_reentrancy() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("test", ctx(json!({"depth": "outer"}))).unwrap();
    recorder.begin("test", ctx(json!({"depth": "inner"}))).unwrap();
    recorder.end("test", Context::new()).unwrap();
    recorder.end("test", Context::new()).unwrap();

    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    // LIFO: the inner block completes first
    assert_eq!(messages[0].context_value("depth"), Some(&json!("inner")));
    assert_eq!(messages[0].nested_level(), Some(1));
    assert_eq!(messages[1].context_value("depth"), Some(&json!("outer")));
    assert_eq!(recorder.nested_level(), 0);
}

#[test]
fn test_same_token_different_categories_are_independent() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("load", ctx(json!({"category": "a"}))).unwrap();
    recorder.begin("load", ctx(json!({"category": "b"}))).unwrap();
    recorder.end("load", ctx(json!({"category": "a"}))).unwrap();

    assert_eq!(recorder.messages().len(), 1);
    assert_eq!(recorder.messages()[0].category(), "a");
    assert_eq!(recorder.pending_count(), 1);
}

// ============================================================================
// Timing and memory
// ============================================================================

#[test]
fn test_duration_and_memory_diff_from_readings() {
    let logger = Arc::new(MemoryLogger::new());
    let mut recorder = Recorder::new(logger, Vec::new())
        .with_probe(ScriptedProbe::new([100.0, 100.25], [1_000, 1_512]));

    recorder.begin("t", Context::new()).unwrap();
    recorder.end("t", Context::new()).unwrap();

    let message = &recorder.messages()[0];
    assert_eq!(message.begin_time(), Some(100.0));
    assert_eq!(message.end_time(), Some(100.25));
    assert_eq!(message.duration(), Some(0.25));
    assert_eq!(message.memory_diff(), Some(512));
    assert_eq!(message.context_value("beginMemory"), Some(&json!(1_000)));
    assert_eq!(message.context_value("endMemory"), Some(&json!(1_512)));
}

#[test]
fn test_memory_diff_can_be_negative() {
    let logger = Arc::new(MemoryLogger::new());
    let mut recorder = Recorder::new(logger, Vec::new())
        .with_probe(ScriptedProbe::new([1.0, 2.0], [4_096, 1_024]));

    recorder.begin("shrink", Context::new()).unwrap();
    recorder.end("shrink", Context::new()).unwrap();

    assert_eq!(recorder.messages()[0].memory_diff(), Some(-3_072));
}

#[test]
fn test_duration_is_consistent_with_system_clock() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("sleep", Context::new()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    recorder.end("sleep", Context::new()).unwrap();

    let message = &recorder.messages()[0];
    let duration = message.duration().unwrap();
    assert!(duration >= 0.004);
    assert_eq!(
        duration,
        message.end_time().unwrap() - message.begin_time().unwrap()
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_end_without_begin() {
    let (mut recorder, _) = recorder_with_logger();

    let err = recorder.end("x", Context::new()).unwrap_err();
    assert!(err.is_runtime_fault());
    assert_eq!(
        err.to_string(),
        "Unexpected Recorder::end() call for category \"application\" token \"x\". A matching begin() was not found."
    );
}

#[test]
fn test_end_with_wrong_category() {
    let (mut recorder, _) = recorder_with_logger();
    recorder.begin("x", ctx(json!({"category": "db"}))).unwrap();

    let err = recorder.end("x", Context::new()).unwrap_err();
    match err {
        ProfilerError::UnmatchedEnd { category, token } => {
            assert_eq!(category, "application");
            assert_eq!(token, "x");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_end_too_many_times() {
    let (mut recorder, _) = recorder_with_logger();
    recorder.begin("x", Context::new()).unwrap();
    recorder.end("x", Context::new()).unwrap();

    assert!(recorder.end("x", Context::new()).unwrap_err().is_runtime_fault());
}

#[test]
fn test_begin_time_override_forbidden() {
    let (mut recorder, _) = recorder_with_logger();
    recorder.begin("x", Context::new()).unwrap();

    let err = recorder.end("x", ctx(json!({"beginTime": 0.0}))).unwrap_err();
    assert!(err.is_invalid_input());
    assert_eq!(
        err.to_string(),
        "It is forbidden to override \"beginTime\" in context."
    );
}

#[test]
fn test_non_string_category_rejected() {
    let (mut recorder, _) = recorder_with_logger();

    let err = recorder.begin("x", ctx(json!({"category": 5}))).unwrap_err();
    assert!(err.is_invalid_input());
    assert_eq!(err.to_string(), "Category should be a string, \"int\" given.");

    let err = recorder.end("x", ctx(json!({"category": null}))).unwrap_err();
    assert_eq!(err.to_string(), "Category should be a string, \"null\" given.");
    assert_eq!(recorder.pending_count(), 0);
}

// ============================================================================
// Flush and leak reporting
// ============================================================================

#[test]
fn test_begin_without_end() {
    let (mut recorder, logger) = recorder_with_logger();

    recorder.begin("t", Context::new()).unwrap();
    recorder.flush().unwrap();

    assert!(recorder.messages().is_empty());
    assert_eq!(recorder.nested_level(), 0);
    assert_eq!(recorder.pending_count(), 0);

    let warnings = logger.records_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "Unclosed profiling entry detected: category \"application\" token \"t\""
    );
}

#[test]
fn test_one_warning_per_category_token_pair() {
    let (mut recorder, logger) = recorder_with_logger();

    recorder.begin("t", Context::new()).unwrap();
    recorder.begin("t", Context::new()).unwrap();
    recorder.begin("u", ctx(json!({"category": "db"}))).unwrap();
    recorder.flush().unwrap();

    assert_eq!(logger.records_at(Level::WARN).len(), 2);
}

#[test]
fn test_flush_clears_messages() {
    let (mut recorder, logger) = recorder_with_logger();

    recorder.begin("anything", ctx(json!({"category": "test"}))).unwrap();
    recorder.end("anything", ctx(json!({"category": "test"}))).unwrap();
    recorder.flush().unwrap();

    assert!(recorder.messages().is_empty());
    assert!(logger.records().is_empty());
}

#[test]
fn test_flush_with_empty_messages() {
    let (mut recorder, _) = recorder_with_logger();
    recorder.flush().unwrap();
    assert!(recorder.messages().is_empty());
}

#[test]
fn test_recording_continues_after_flush() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("open", Context::new()).unwrap();
    recorder.flush().unwrap();

    // The abandoned block is gone; ending it now is a fault
    assert!(recorder.end("open", Context::new()).is_err());

    recorder.begin("fresh", Context::new()).unwrap();
    recorder.end("fresh", Context::new()).unwrap();
    assert_eq!(recorder.find_messages("fresh")[0].nested_level(), Some(0));
}

// ============================================================================
// Queries and enable switch
// ============================================================================

#[test]
fn test_find_messages() {
    let (mut recorder, _) = recorder_with_logger();

    recorder.begin("test", ctx(json!({"n": 1}))).unwrap();
    recorder.end("test", Context::new()).unwrap();
    recorder.begin("test", ctx(json!({"n": 2}))).unwrap();
    recorder.end("test", Context::new()).unwrap();
    recorder.begin("another test", Context::new()).unwrap();
    recorder.end("another test", Context::new()).unwrap();

    let found = recorder.find_messages("test");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].context_value("n"), Some(&json!(1)));
    assert_eq!(found[1].context_value("n"), Some(&json!(2)));
    assert!(recorder.find_messages("missing").is_empty());
}

#[test]
fn test_enabled() {
    let (recorder, _) = recorder_with_logger();

    let mut recorder = recorder.enable(false);
    assert!(!recorder.is_enabled());
    recorder.begin("test", Context::new()).unwrap();
    recorder.end("test", Context::new()).unwrap();
    assert!(recorder.messages().is_empty());

    let mut recorder = recorder.enable(true);
    assert!(recorder.is_enabled());
    recorder.begin("test", Context::new()).unwrap();
    recorder.end("test", Context::new()).unwrap();
    assert_eq!(recorder.messages().len(), 1);
}

#[test]
fn test_disabled_recorder_skips_validation() {
    let (recorder, _) = recorder_with_logger();
    let mut recorder = recorder.enable(false);

    // Disabled recorders do nothing at all, including failing
    assert!(recorder.end("never-begun", Context::new()).is_ok());
    assert!(recorder.begin("x", ctx(json!({"category": 1}))).is_ok());
}
