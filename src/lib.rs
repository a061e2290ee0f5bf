//! blockprof - in-process block profiler
//!
//! Callers bracket named, nestable blocks of work with `begin` / `end`. The
//! [`Recorder`] measures wall time and memory deltas for each block and, on
//! `flush`, ships the completed messages to every registered target, each
//! of which filters by category before exporting.
//!
//! ```
//! use blockprof::{Context, Recorder};
//!
//! let mut recorder = Recorder::default();
//! recorder.begin("outer", Context::new()).unwrap();
//! recorder.begin("inner", Context::new()).unwrap();
//! recorder.end("inner", Context::new()).unwrap();
//! recorder.end("outer", Context::new()).unwrap();
//!
//! assert_eq!(recorder.find_messages("inner")[0].nested_level(), Some(1));
//! recorder.flush().unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod logger;
pub mod message;
pub mod probe;
pub mod recorder;
pub mod target;

pub use error::{ProfilerError, Result};
pub use filter::CategoryFilter;
pub use logger::{MemoryLogger, ProfileLogger, TracingLogger};
pub use message::{Context, Message};
pub use probe::{Probe, ScriptedProbe, SystemProbe};
pub use recorder::{Profiler, Recorder};
pub use target::{FileTarget, LogTarget, Target, TargetBuilder};
