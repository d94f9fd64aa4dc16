//! Error codes.
//!
//! Registration and run-control calls report through two types: the
//! [`ErrorCode`] value every call leaves behind as the engine's last error,
//! and the [`EngineError`] carried in the `Err` arm of their results.
//! Duplicate names are warnings, not errors: the object is still added and
//! the call returns [`Added::Duplicate`].

use std::fmt;

use suitcase_pool::PoolError;

/// Status of the most recent registration or run-control call.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ErrorCode {
    /// No error.
    #[default]
    Success,
    /// A pool had no room for the requested object.
    NoMemory,
    /// No registry is active.
    NoRegistry,
    /// A suite name was missing.
    NoSuiteName,
    /// A test name was missing.
    NoTestName,
    /// The suite handle does not resolve.
    NoSuite,
    /// The test handle does not resolve.
    NoTest,
    /// A suite with the same name was already registered.
    DuplicateSuite,
    /// A test with the same name was already registered in the suite.
    DuplicateTest,
    /// A suite was inactive during a run.
    SuiteInactive,
    /// A test was inactive during a run.
    TestInactive,
    /// The test does not belong to the given suite.
    TestNotInSuite,
    /// A suite's init function reported failure.
    SuiteInitFailed,
    /// A suite's cleanup function reported failure.
    SuiteCleanupFailed,
}

impl ErrorCode {
    pub fn is_success(self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Stable identifier for this code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::NoMemory => "NoMemory",
            ErrorCode::NoRegistry => "NoRegistry",
            ErrorCode::NoSuiteName => "NoSuiteName",
            ErrorCode::NoTestName => "NoTestName",
            ErrorCode::NoSuite => "NoSuite",
            ErrorCode::NoTest => "NoTest",
            ErrorCode::DuplicateSuite => "DuplicateSuite",
            ErrorCode::DuplicateTest => "DuplicateTest",
            ErrorCode::SuiteInactive => "SuiteInactive",
            ErrorCode::TestInactive => "TestInactive",
            ErrorCode::TestNotInSuite => "TestNotInSuite",
            ErrorCode::SuiteInitFailed => "SuiteInitFailed",
            ErrorCode::SuiteCleanupFailed => "SuiteCleanupFailed",
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Success => "no error condition",
            ErrorCode::NoMemory => "memory allocation failed",
            ErrorCode::NoRegistry => "test registry not initialized",
            ErrorCode::NoSuiteName => "suite name cannot be empty",
            ErrorCode::NoTestName => "test name cannot be empty",
            ErrorCode::NoSuite => "suite not found",
            ErrorCode::NoTest => "test not found",
            ErrorCode::DuplicateSuite => "suite name already in use",
            ErrorCode::DuplicateTest => "test name already in use in this suite",
            ErrorCode::SuiteInactive => "suite is inactive",
            ErrorCode::TestInactive => "test is inactive",
            ErrorCode::TestNotInSuite => "test not registered in the given suite",
            ErrorCode::SuiteInitFailed => "suite initialization function failed",
            ErrorCode::SuiteCleanupFailed => "suite cleanup function failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_str())
    }
}

/// Failure of a registration or run-control call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("out of memory: {0}")]
    NoMemory(#[from] PoolError),
    #[error("test registry not initialized")]
    NoRegistry,
    #[error("suite name cannot be empty")]
    NoSuiteName,
    #[error("test name cannot be empty")]
    NoTestName,
    #[error("suite not found")]
    NoSuite,
    #[error("test not found")]
    NoTest,
    #[error("suite is inactive")]
    SuiteInactive,
    #[error("test is inactive")]
    TestInactive,
    #[error("test not registered in the given suite")]
    TestNotInSuite,
    #[error("suite initialization function failed")]
    SuiteInitFailed,
    #[error("suite cleanup function failed")]
    SuiteCleanupFailed,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NoMemory(_) => ErrorCode::NoMemory,
            EngineError::NoRegistry => ErrorCode::NoRegistry,
            EngineError::NoSuiteName => ErrorCode::NoSuiteName,
            EngineError::NoTestName => ErrorCode::NoTestName,
            EngineError::NoSuite => ErrorCode::NoSuite,
            EngineError::NoTest => ErrorCode::NoTest,
            EngineError::SuiteInactive => ErrorCode::SuiteInactive,
            EngineError::TestInactive => ErrorCode::TestInactive,
            EngineError::TestNotInSuite => ErrorCode::TestNotInSuite,
            EngineError::SuiteInitFailed => ErrorCode::SuiteInitFailed,
            EngineError::SuiteCleanupFailed => ErrorCode::SuiteCleanupFailed,
        }
    }
}

/// A successfully registered suite or test.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Added<Id> {
    /// The name was not in use.
    Unique(Id),
    /// The name was already in use. The object was added anyway but is not
    /// reachable by name lookup.
    Duplicate(Id),
}

impl<Id: Copy> Added<Id> {
    pub fn id(&self) -> Id {
        match *self {
            Added::Unique(id) | Added::Duplicate(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Added::Duplicate(_))
    }
}

/// Code left behind by a call, given the code a duplicate maps to.
pub(crate) fn code_of<Id>(result: &Result<Added<Id>, EngineError>, duplicate: ErrorCode) -> ErrorCode {
    match result {
        Ok(Added::Unique(_)) => ErrorCode::Success,
        Ok(Added::Duplicate(_)) => duplicate,
        Err(err) => err.code(),
    }
}

/// Code left behind by a run-control or activation call.
pub(crate) fn code_of_run(result: &Result<(), EngineError>) -> ErrorCode {
    match result {
        Ok(()) => ErrorCode::Success,
        Err(err) => err.code(),
    }
}
