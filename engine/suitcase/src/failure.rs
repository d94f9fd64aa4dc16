//! Failure records collected during a run.

use std::fmt;

use suitcase_pool::Pool;

use crate::config::Limits;
use crate::error::EngineError;
use crate::registry::{Suite, SuiteId, Test, TestId};
use crate::text::bounded;

/// File name recorded for failures raised by the engine itself.
pub const SYSTEM_FILE: &str = "suitcase";

/// What kind of condition a [`FailureRecord`] describes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FailureKind {
    /// A user assertion evaluated false.
    AssertFailed,
    /// A suite's init function returned nonzero.
    SuiteInitFailed,
    /// A suite's cleanup function returned nonzero.
    SuiteCleanupFailed,
    /// An inactive suite was reached by a run.
    SuiteInactive,
    /// An inactive test was reached by a run.
    TestInactive,
}

/// Failures raised by the engine itself rather than by an assertion.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum SystemFailure {
    SuiteInitFailed,
    SuiteCleanupFailed,
    SuiteInactive,
    TestInactive,
}

impl SystemFailure {
    pub(crate) fn kind(self) -> FailureKind {
        match self {
            SystemFailure::SuiteInitFailed => FailureKind::SuiteInitFailed,
            SystemFailure::SuiteCleanupFailed => FailureKind::SuiteCleanupFailed,
            SystemFailure::SuiteInactive => FailureKind::SuiteInactive,
            SystemFailure::TestInactive => FailureKind::TestInactive,
        }
    }

    /// Fixed condition text of the record.
    pub(crate) fn condition(self) -> &'static str {
        match self {
            SystemFailure::SuiteInitFailed => "Suite Initialization failed - Suite Skipped",
            SystemFailure::SuiteCleanupFailed => "Suite cleanup failed.",
            SystemFailure::SuiteInactive => "Suite inactive",
            SystemFailure::TestInactive => "Test inactive",
        }
    }
}

/// One recorded failure.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FailureRecord {
    pub kind: FailureKind,
    /// Source line, 0 when not applicable.
    pub line: u32,
    pub condition: String,
    pub file: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub suite: SuiteId,
    pub suite_name: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub test: Option<TestId>,
    pub test_name: Option<String>,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: ", self.file, self.line)?;
        match &self.test_name {
            Some(test) => write!(f, "{}::{}: ", self.suite_name, test)?,
            None => write!(f, "{}: ", self.suite_name)?,
        }
        f.write_str(&self.condition)
    }
}

/// Position in a [`FailureStore`], used to find the failures a suite or
/// test added.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FailureMark {
    recorded: usize,
    dropped: u32,
}

/// Append-only failure list for the current run, backed by a bounded pool.
///
/// When the pool is full further failures are dropped and counted.
pub struct FailureStore {
    records: Pool<FailureRecord>,
    dropped: u32,
    max_text_len: usize,
}

impl FailureStore {
    pub(crate) fn new(limits: &Limits) -> Result<Self, EngineError> {
        Ok(FailureStore {
            records: Pool::with_capacity(limits.max_failures)?,
            dropped: 0,
            max_text_len: limits.max_name_len,
        })
    }

    /// Append a failure. Returns `false` if it had to be dropped.
    pub(crate) fn push(
        &mut self,
        kind: FailureKind,
        line: u32,
        condition: &str,
        file: &str,
        suite: &Suite,
        test: Option<&Test>,
    ) -> bool {
        let record = FailureRecord {
            kind,
            line,
            condition: bounded(condition, self.max_text_len),
            file: bounded(file, self.max_text_len),
            suite: suite.id(),
            suite_name: suite.name().to_owned(),
            test: test.map(Test::id),
            test_name: test.map(|t| t.name().to_owned()),
        };
        match self.records.alloc(record) {
            Ok(_) => true,
            Err(err) => {
                self.dropped += 1;
                tracing::warn!(%err, ?kind, dropped = self.dropped, "failure record not stored");
                false
            }
        }
    }

    /// Discard every record and reclaim the pool.
    pub(crate) fn clear(&mut self) {
        self.records.reset();
        self.dropped = 0;
    }

    pub(crate) fn mark(&self) -> FailureMark {
        FailureMark {
            recorded: self.records.len(),
            dropped: self.dropped,
        }
    }

    /// Whether anything was recorded or dropped after `mark`.
    pub(crate) fn grew_since(&self, mark: FailureMark) -> bool {
        self.records.len() > mark.recorded || self.dropped > mark.dropped
    }

    /// Records added after `mark`; empty when there are none.
    pub(crate) fn since(&self, mark: FailureMark) -> &[FailureRecord] {
        self.records.tail(mark.recorded)
    }

    pub fn as_slice(&self) -> &[FailureRecord] {
        self.records.as_slice()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &FailureRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Failures that could not be stored during the current run.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl fmt::Debug for FailureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureStore")
            .field("records", &self.records.as_slice())
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}
