//! Assertion entry point for running tests.
//!
//! A test body receives a [`TestContext`] for the duration of its call and
//! records assertions through it. A failing *fatal* assertion yields
//! [`Aborted`], which the test propagates with `?`; the run loop consumes it
//! at the single call site that invoked the test, so an abort never escapes
//! the test it was raised in.

use std::fmt;

use crate::failure::FailureKind;
use crate::registry::{Suite, Test};
use crate::run::RunState;
use crate::summary::RunSummary;

/// Signal that a fatal assertion failed and the test body must stop.
///
/// Only a failing fatal assertion can produce this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aborted {
    line: u32,
}

impl Aborted {
    /// Line of the fatal assertion that raised the abort.
    pub fn line(self) -> u32 {
        self.line
    }
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test aborted by fatal assertion at line {}", self.line)
    }
}

/// Return type of test bodies.
pub type TestResult = Result<(), Aborted>;

/// Handle through which a running test records assertions.
pub struct TestContext<'run> {
    state: &'run mut RunState,
    suite: &'run Suite,
    test: &'run Test,
}

impl<'run> TestContext<'run> {
    pub(crate) fn new(state: &'run mut RunState, suite: &'run Suite, test: &'run Test) -> Self {
        TestContext { state, suite, test }
    }

    /// Record an assertion.
    ///
    /// Counts the assertion; when `value` is false, counts the failure and
    /// appends a failure record. A fatal failure returns [`Aborted`];
    /// otherwise `value` is handed back so the caller can branch on it.
    pub fn check(
        &mut self,
        value: bool,
        line: u32,
        condition: &str,
        file: &str,
        fatal: bool,
    ) -> Result<bool, Aborted> {
        self.state.summary.asserts += 1;
        if value {
            tracing::trace!(line, condition, "assertion passed");
            return Ok(true);
        }

        self.state.summary.asserts_failed += 1;
        tracing::debug!(
            suite = self.suite.name(),
            test = self.test.name(),
            line,
            condition,
            fatal,
            "assertion failed"
        );
        self.state.add_failure(
            FailureKind::AssertFailed,
            line,
            condition,
            file,
            self.suite,
            Some(self.test),
        );
        if fatal {
            Err(Aborted { line })
        } else {
            Ok(false)
        }
    }

    /// Non-fatal assertion. Returns `value`.
    pub fn assert(&mut self, value: bool, line: u32, condition: &str, file: &str) -> bool {
        self.check(value, line, condition, file, false).unwrap_or(false)
    }

    /// Fatal assertion: on failure the test must return the error.
    pub fn assert_fatal(&mut self, value: bool, line: u32, condition: &str, file: &str) -> TestResult {
        self.check(value, line, condition, file, true).map(|_| ())
    }

    /// Record an unconditional, non-fatal failure.
    pub fn fail(&mut self, line: u32, message: &str, file: &str) {
        self.assert(false, line, message, file);
    }

    /// Record an unconditional failure and abort the test.
    pub fn fail_fatal(&mut self, line: u32, message: &str, file: &str) -> TestResult {
        self.assert_fatal(false, line, message, file)
    }

    /// Suite the running test belongs to.
    pub fn current_suite(&self) -> &Suite {
        self.suite
    }

    /// The running test.
    pub fn current_test(&self) -> &Test {
        self.test
    }

    /// Counters accumulated so far in this run.
    pub fn summary(&self) -> &RunSummary {
        &self.state.summary
    }
}

/// Non-fatal assertion; evaluates to the condition's value.
///
/// ```ignore
/// unit_assert!(t, total == 3);
/// ```
#[macro_export]
macro_rules! unit_assert {
    ($ctx:expr, $cond:expr $(,)?) => {
        $ctx.assert($cond, line!(), stringify!($cond), file!())
    };
}

/// Fatal assertion; returns from the enclosing test on failure.
#[macro_export]
macro_rules! unit_assert_fatal {
    ($ctx:expr, $cond:expr $(,)?) => {
        $ctx.assert_fatal($cond, line!(), stringify!($cond), file!())?
    };
}

/// Non-fatal equality assertion.
#[macro_export]
macro_rules! unit_assert_eq {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.assert(
            ($left) == ($right),
            line!(),
            concat!("unit_assert_eq!(", stringify!($left), ", ", stringify!($right), ")"),
            file!(),
        )
    };
}

/// Fatal equality assertion.
#[macro_export]
macro_rules! unit_assert_eq_fatal {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.assert_fatal(
            ($left) == ($right),
            line!(),
            concat!("unit_assert_eq!(", stringify!($left), ", ", stringify!($right), ")"),
            file!(),
        )?
    };
}

/// Non-fatal inequality assertion.
#[macro_export]
macro_rules! unit_assert_ne {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.assert(
            ($left) != ($right),
            line!(),
            concat!("unit_assert_ne!(", stringify!($left), ", ", stringify!($right), ")"),
            file!(),
        )
    };
}

/// Unconditional failure with a message. Append `fatal` to abort the test.
#[macro_export]
macro_rules! unit_fail {
    ($ctx:expr, $msg:expr $(,)?) => {
        $ctx.fail(line!(), $msg, file!())
    };
    ($ctx:expr, $msg:expr, fatal $(,)?) => {
        $ctx.fail_fatal(line!(), $msg, file!())?
    };
}
