//! Aggregate counters for the most recent run.

use std::time::Duration;

/// Counters reset at the start of every run entry point.
///
/// `failure_records` always equals the length of the engine's failure list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    pub suites_run: u32,
    pub suites_failed: u32,
    pub suites_inactive: u32,
    pub tests_run: u32,
    pub tests_failed: u32,
    pub tests_inactive: u32,
    pub asserts: u32,
    pub asserts_failed: u32,
    pub failure_records: u32,
    /// Failures that did not fit in the failure pool.
    pub failures_dropped: u32,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        RunSummary::default()
    }

    pub fn asserts_passed(&self) -> u32 {
        self.asserts - self.asserts_failed
    }

    pub fn tests_passed(&self) -> u32 {
        self.tests_run - self.tests_failed
    }

    /// Elapsed wall time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Returns true if any suite, test, or assertion failed.
    pub fn has_failures(&self) -> bool {
        self.failure_records > 0 || self.failures_dropped > 0
    }
}
