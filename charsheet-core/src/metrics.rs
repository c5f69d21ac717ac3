//! Evaluation counters.
//!
//! Lock-free `AtomicU64` counters bumped on the evaluation path and read on
//! demand, e.g. by the CLI or a host diagnostics page.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the evaluation cycle.
#[derive(Debug, Default)]
pub struct EvalCounters {
    /// Cycles that reached the model call.
    pub cycles_started: AtomicU64,
    /// Calls dropped because a cycle was already running.
    pub skipped_in_flight: AtomicU64,
    /// Calls skipped because evaluation is disabled or the roster is empty.
    pub skipped_idle: AtomicU64,
    /// Model invocations that failed.
    pub model_failures: AtomicU64,
    /// Replies without a usable JSON object.
    pub parse_failures: AtomicU64,
    /// Participants that received a title or stats.
    pub participants_updated: AtomicU64,
    /// Individual stat values written.
    pub stats_written: AtomicU64,
}

impl EvalCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            skipped_in_flight: AtomicU64::new(0),
            skipped_idle: AtomicU64::new(0),
            model_failures: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            participants_updated: AtomicU64::new(0),
            stats_written: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            skipped_in_flight: self.skipped_in_flight.load(Ordering::Relaxed),
            skipped_idle: self.skipped_idle.load(Ordering::Relaxed),
            model_failures: self.model_failures.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            participants_updated: self.participants_updated.load(Ordering::Relaxed),
            stats_written: self.stats_written.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`EvalCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// See [`EvalCounters::cycles_started`].
    pub cycles_started: u64,
    /// See [`EvalCounters::skipped_in_flight`].
    pub skipped_in_flight: u64,
    /// See [`EvalCounters::skipped_idle`].
    pub skipped_idle: u64,
    /// See [`EvalCounters::model_failures`].
    pub model_failures: u64,
    /// See [`EvalCounters::parse_failures`].
    pub parse_failures: u64,
    /// See [`EvalCounters::participants_updated`].
    pub participants_updated: u64,
    /// See [`EvalCounters::stats_written`].
    pub stats_written: u64,
}

impl std::fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles={} skipped_in_flight={} skipped_idle={} model_failures={} parse_failures={} participants_updated={} stats_written={}",
            self.cycles_started,
            self.skipped_in_flight,
            self.skipped_idle,
            self.model_failures,
            self.parse_failures,
            self.participants_updated,
            self.stats_written,
        )
    }
}
