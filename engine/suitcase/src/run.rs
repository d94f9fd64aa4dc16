//! The run loop.
//!
//! Every run entry point follows the same shape: clear the previous
//! results, mark the run in progress, walk suites and tests, then record
//! the elapsed time and hand the full failure list to the all-complete
//! handler.
//!
//! Per suite: suite-start handler; inactive suites are counted (and
//! recorded when failing on inactive) and skipped; a failing init function
//! skips the tests *and* the cleanup; otherwise tests run in order and the
//! cleanup function is called afterwards. Per test: test-start handler,
//! setup, the body, teardown (also after an abort), test-complete handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{EngineConfig, ErrorAction, Limits};
use crate::context::TestContext;
use crate::engine::Engine;
use crate::error::{code_of_run, EngineError};
use crate::failure::{FailureKind, FailureStore, SystemFailure, SYSTEM_FILE};
use crate::handlers::Handlers;
use crate::registry::{Registry, Suite, SuiteId, Test, TestId};
use crate::summary::RunSummary;

/// Mutable state of the current (or most recent) run.
#[derive(Debug)]
pub(crate) struct RunState {
    pub(crate) summary: RunSummary,
    pub(crate) failures: FailureStore,
    pub(crate) current_suite: Option<SuiteId>,
    pub(crate) current_test: Option<TestId>,
    pub(crate) running: bool,
    /// Flag kept equal to `running`, for readers that cannot borrow the engine.
    pub(crate) running_mirror: Option<&'static AtomicBool>,
}

impl RunState {
    pub(crate) fn new(limits: &Limits) -> Result<Self, EngineError> {
        Ok(RunState {
            summary: RunSummary::new(),
            failures: FailureStore::new(limits)?,
            current_suite: None,
            current_test: None,
            running: false,
            running_mirror: None,
        })
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
        if let Some(mirror) = self.running_mirror {
            mirror.store(running, Ordering::SeqCst);
        }
    }

    /// Zero the counters and discard the failure list.
    pub(crate) fn clear_previous_results(&mut self) {
        self.summary = RunSummary::new();
        self.failures.clear();
    }

    /// Append a failure record, keeping the summary count in step with the
    /// failure list.
    pub(crate) fn add_failure(
        &mut self,
        kind: FailureKind,
        line: u32,
        condition: &str,
        file: &str,
        suite: &Suite,
        test: Option<&Test>,
    ) {
        if self.failures.push(kind, line, condition, file, suite, test) {
            self.summary.failure_records += 1;
        } else {
            self.summary.failures_dropped += 1;
        }
        debug_assert_eq!(self.summary.failure_records as usize, self.failures.len());
    }

    /// Record one of the engine's own failures (no source line).
    fn add_system_failure(&mut self, failure: SystemFailure, suite: &Suite, test: Option<&Test>) {
        self.add_failure(failure.kind(), 0, failure.condition(), SYSTEM_FILE, suite, test);
    }
}

/// Keep the first error, replacing only a success.
fn keep_first(acc: &mut Result<(), EngineError>, next: Result<(), EngineError>) {
    if acc.is_ok() {
        *acc = next;
    }
}

/// One traversal of suites and tests.
///
/// Dropping the runner ends the run even when a handler or test body
/// panics, so the engine is never left marked as running.
struct Runner<'e> {
    state: &'e mut RunState,
    handlers: &'e Handlers,
    fail_on_inactive: bool,
    error_action: ErrorAction,
    started: Instant,
}

impl<'e> Runner<'e> {
    fn begin(state: &'e mut RunState, handlers: &'e Handlers, config: &EngineConfig) -> Self {
        assert!(!state.running, "a test run is already in progress");
        state.set_running(true);
        state.current_suite = None;
        state.current_test = None;
        Runner {
            state,
            handlers,
            fail_on_inactive: config.fail_on_inactive,
            error_action: config.error_action,
            started: Instant::now(),
        }
    }

    /// Whether traversal continues after `result`.
    fn keep_going(&self, result: &Result<(), EngineError>) -> bool {
        result.is_ok() || self.error_action == ErrorAction::Ignore
    }

    /// Close the run: elapsed time, then the all-complete handler.
    fn finish(self) {
        self.state.set_running(false);
        self.state.summary.elapsed = self.started.elapsed();
        tracing::debug!(
            suites_run = self.state.summary.suites_run,
            tests_run = self.state.summary.tests_run,
            failures = self.state.summary.failure_records,
            "run complete"
        );
        self.handlers.on_all_complete(self.state.failures.as_slice());
    }

    /// Count an inactive suite, recording it when inactive means failure.
    fn suite_inactive(&mut self, suite: &Suite) -> Result<(), EngineError> {
        self.state.summary.suites_inactive += 1;
        if self.fail_on_inactive {
            self.state.add_system_failure(SystemFailure::SuiteInactive, suite, None);
            return Err(EngineError::SuiteInactive);
        }
        Ok(())
    }

    /// Count an inactive test, recording it when inactive means failure.
    ///
    /// A test that was asked for by handle (`requested`) reports
    /// `TestInactive` whatever the policy.
    fn test_inactive(&mut self, suite: &Suite, test: &Test, requested: bool) -> Result<(), EngineError> {
        self.state.summary.tests_inactive += 1;
        if self.fail_on_inactive {
            self.state.add_system_failure(SystemFailure::TestInactive, suite, Some(test));
        }
        if self.fail_on_inactive || requested {
            return Err(EngineError::TestInactive);
        }
        Ok(())
    }

    /// Run one suite: every test in order, or only `only` when given.
    #[tracing::instrument(level = "debug", skip_all, fields(suite = registry[suite].name()))]
    fn run_suite(&mut self, registry: &mut Registry, suite: SuiteId, only: Option<TestId>) -> Result<(), EngineError> {
        let mark = self.state.failures.mark();
        self.state.current_suite = Some(suite);
        self.state.current_test = None;
        registry[suite].reset_tallies();

        let handlers = self.handlers;
        handlers.on_suite_start(&registry[suite]);

        let result = if registry[suite].is_active() {
            self.run_active_suite(registry, suite, only)
        } else {
            tracing::debug!("suite inactive");
            self.suite_inactive(&registry[suite])
        };

        handlers.on_suite_complete(&registry[suite], self.state.failures.since(mark));
        self.state.current_suite = None;
        result
    }

    fn run_active_suite(&mut self, registry: &mut Registry, suite: SuiteId, only: Option<TestId>) -> Result<(), EngineError> {
        let handlers = self.handlers;
        let hooks = registry[suite].hooks().clone();

        if let Some(init) = &hooks.init {
            let status = init();
            if status != 0 {
                tracing::debug!(status, "suite init failed; tests and cleanup skipped");
                handlers.on_suite_init_failure(&registry[suite]);
                self.state.summary.suites_failed += 1;
                self.state
                    .add_system_failure(SystemFailure::SuiteInitFailed, &registry[suite], None);
                return Err(EngineError::SuiteInitFailed);
            }
        }

        let mut result = Ok(());
        let mut cursor = match only {
            Some(test) => Some(test),
            None => registry.first_test(suite),
        };
        while let Some(test) = cursor {
            if !self.keep_going(&result) {
                break;
            }
            cursor = if only.is_some() { None } else { registry.next_test(test) };

            let mark = self.state.failures.mark();
            let active = registry[test].is_active();
            let outcome = if active || only.is_some() {
                self.run_test(registry, suite, test)
            } else {
                self.test_inactive(&registry[suite], &registry[test], false)
            };
            keep_first(&mut result, outcome);

            let failed = self.state.failures.grew_since(mark);
            if active || failed {
                registry[suite].tally(failed);
            }
        }
        self.state.summary.suites_run += 1;

        if let Some(cleanup) = &hooks.cleanup {
            let status = cleanup();
            if status != 0 {
                tracing::debug!(status, "suite cleanup failed");
                handlers.on_suite_cleanup_failure(&registry[suite]);
                self.state.summary.suites_failed += 1;
                self.state
                    .add_system_failure(SystemFailure::SuiteCleanupFailed, &registry[suite], None);
                keep_first(&mut result, Err(EngineError::SuiteCleanupFailed));
            }
        }
        result
    }

    /// Run one test of the current suite.
    #[tracing::instrument(level = "debug", skip_all, fields(test = registry[test].name()))]
    fn run_test(&mut self, registry: &Registry, suite: SuiteId, test: TestId) -> Result<(), EngineError> {
        let suite = &registry[suite];
        let test = &registry[test];
        debug_assert_eq!(self.state.current_suite, Some(suite.id()));
        debug_assert!(suite.is_active());

        let mark = self.state.failures.mark();
        self.state.current_test = Some(test.id());
        self.handlers.on_test_start(test, suite);

        let result = if test.is_active() {
            let hooks = suite.hooks();
            if let Some(setup) = &hooks.setup {
                setup();
            }

            let body = Arc::clone(test.func());
            let mut ctx = TestContext::new(self.state, suite, test);
            if let Err(aborted) = body(&mut ctx) {
                tracing::debug!(line = aborted.line(), "test aborted");
            }

            if let Some(teardown) = &hooks.teardown {
                teardown();
            }
            self.state.summary.tests_run += 1;
            Ok(())
        } else {
            // Inactive tests only get here when run by handle.
            self.test_inactive(suite, test, true)
        };

        if test.is_active() && self.state.failures.grew_since(mark) {
            self.state.summary.tests_failed += 1;
        }
        self.handlers
            .on_test_complete(test, suite, self.state.failures.since(mark));
        self.state.current_test = None;
        result
    }
}

impl Drop for Runner<'_> {
    fn drop(&mut self) {
        self.state.set_running(false);
        self.state.current_suite = None;
        self.state.current_test = None;
    }
}

impl Engine {
    /// Run every suite of the active registry in registration order.
    ///
    /// Returns the first non-success code met; with
    /// [`ErrorAction::Ignore`] the run still visits every suite.
    pub fn run_all(&mut self) -> Result<(), EngineError> {
        self.state.clear_previous_results();
        let Some(registry) = self.registry.as_mut() else {
            return self.record_run(Err(EngineError::NoRegistry));
        };

        let _span = tracing::debug_span!("run_all", suites = registry.suite_count()).entered();
        let mut runner = Runner::begin(&mut self.state, &self.handlers, &self.config);
        let mut result = Ok(());
        let mut position = 0;
        while let Some(suite) = registry.suite_at(position) {
            if !runner.keep_going(&result) {
                break;
            }
            let outcome = runner.run_suite(registry, suite, None);
            keep_first(&mut result, outcome);
            position += 1;
        }
        runner.finish();
        self.record_run(result)
    }

    /// Run one suite of the active registry.
    pub fn run_suite(&mut self, suite: SuiteId) -> Result<(), EngineError> {
        self.state.clear_previous_results();
        let registry = match self.registry.as_mut() {
            None => return self.record_run(Err(EngineError::NoRegistry)),
            Some(registry) if registry.suite(suite).is_none() => {
                return self.record_run(Err(EngineError::NoSuite));
            }
            Some(registry) => registry,
        };

        let mut runner = Runner::begin(&mut self.state, &self.handlers, &self.config);
        let result = runner.run_suite(registry, suite, None);
        runner.finish();
        self.record_run(result)
    }

    /// Run a single test of `suite`, with the suite's init and cleanup
    /// around it.
    pub fn run_test(&mut self, suite: SuiteId, test: TestId) -> Result<(), EngineError> {
        self.state.clear_previous_results();
        let Some(registry) = self.registry.as_mut() else {
            return self.record_run(Err(EngineError::NoRegistry));
        };
        let Some(suite_ref) = registry.suite(suite) else {
            return self.record_run(Err(EngineError::NoSuite));
        };
        if registry.test(test).is_none() {
            return self.record_run(Err(EngineError::NoTest));
        }
        if !suite_ref.is_active() {
            self.state.summary.suites_inactive += 1;
            if self.config.fail_on_inactive {
                self.state
                    .add_system_failure(SystemFailure::SuiteInactive, suite_ref, None);
            }
            return self.record_run(Err(EngineError::SuiteInactive));
        }
        if !registry.contains_test(suite, test) {
            return self.record_run(Err(EngineError::TestNotInSuite));
        }

        let mut runner = Runner::begin(&mut self.state, &self.handlers, &self.config);
        let result = runner.run_suite(registry, suite, Some(test));
        runner.finish();
        self.record_run(result)
    }

    /// Zero the run summary and discard the failure list.
    pub fn clear_previous_results(&mut self) {
        self.state.clear_previous_results();
    }

    fn record_run(&mut self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        self.last_error = code_of_run(&result);
        debug_assert_eq!(
            self.state.summary.failure_records as usize,
            self.state.failures.len()
        );
        result
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
