//! Clock and memory readings for profiling blocks
//!
//! The recorder takes one wall-clock and one memory reading at `begin` and
//! again at `end`. Readings go through the [`Probe`] trait so embedders (and
//! tests) can substitute a deterministic source.

use nix::sys::resource::{getrusage, UsageWho};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Source of timestamps and memory usage
pub trait Probe {
    /// Current wall-clock time in seconds since the Unix epoch
    fn now(&self) -> f64;

    /// Current memory usage of this process in bytes
    fn memory_usage(&self) -> i64;
}

/// Wall-clock seconds since the Unix epoch
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Peak resident set size of this process in bytes (0 if unavailable)
pub fn peak_memory_usage() -> i64 {
    match getrusage(UsageWho::RUSAGE_SELF) {
        // Linux reports ru_maxrss in kilobytes
        Ok(usage) => usage.max_rss() as i64 * 1024,
        Err(e) => {
            tracing::debug!("getrusage failed: {}", e);
            0
        }
    }
}

/// Probe backed by the system clock and the process resident set size
///
/// Wall time is read once at construction; later readings add the
/// monotonic time elapsed since then, so they never go backwards.
pub struct SystemProbe {
    base_time: f64,
    started: Instant,
    pid: Option<Pid>,
    system: RefCell<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Cannot resolve current pid, memory readings disabled: {}", e);
                None
            }
        };

        Self {
            base_time: unix_time(),
            started: Instant::now(),
            pid,
            system: RefCell::new(System::new()),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProbe")
            .field("base_time", &self.base_time)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl Probe for SystemProbe {
    fn now(&self) -> f64 {
        self.base_time + self.started.elapsed().as_secs_f64()
    }

    fn memory_usage(&self) -> i64 {
        let Some(pid) = self.pid else {
            return 0;
        };

        let mut system = self.system.borrow_mut();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system
            .process(pid)
            .map(|process| process.memory() as i64)
            .unwrap_or(0)
    }
}

/// Probe that replays scripted readings
///
/// Each call to `now` / `memory_usage` consumes the next scripted value;
/// once the script runs out the last value repeats.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    times: RefCell<VecDeque<f64>>,
    memory: RefCell<VecDeque<i64>>,
    last_time: RefCell<f64>,
    last_memory: RefCell<i64>,
}

impl ScriptedProbe {
    pub fn new<T, M>(times: T, memory: M) -> Self
    where
        T: IntoIterator<Item = f64>,
        M: IntoIterator<Item = i64>,
    {
        Self {
            times: RefCell::new(times.into_iter().collect()),
            memory: RefCell::new(memory.into_iter().collect()),
            ..Default::default()
        }
    }
}

impl Probe for ScriptedProbe {
    fn now(&self) -> f64 {
        let mut last = self.last_time.borrow_mut();
        if let Some(next) = self.times.borrow_mut().pop_front() {
            *last = next;
        }
        *last
    }

    fn memory_usage(&self) -> i64 {
        let mut last = self.last_memory.borrow_mut();
        if let Some(next) = self.memory.borrow_mut().pop_front() {
            *last = next;
        }
        *last
    }
}
