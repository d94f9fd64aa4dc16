//! Lifecycle callbacks.
//!
//! Each event has one optional slot; an empty slot is a no-op. Handlers run
//! synchronously on the run loop's thread, and a panic inside one
//! propagates out of the run entry point.

use std::fmt;

use crate::failure::FailureRecord;
use crate::registry::{Suite, Test};

/// Called with a suite: suite start, init failure, cleanup failure.
pub type SuiteHandler = Box<dyn Fn(&Suite) + Send>;
/// Called before each test.
pub type TestStartHandler = Box<dyn Fn(&Test, &Suite) + Send>;
/// Called after each test with the failures it added.
pub type TestCompleteHandler = Box<dyn Fn(&Test, &Suite, &[FailureRecord]) + Send>;
/// Called after each suite with the failures it added.
pub type SuiteCompleteHandler = Box<dyn Fn(&Suite, &[FailureRecord]) + Send>;
/// Called once at the end of a run with the full failure list.
pub type AllCompleteHandler = Box<dyn Fn(&[FailureRecord]) + Send>;

/// Generates the setter, clearer and getter for one handler slot.
macro_rules! handler_slot {
    ($field:ident, $set:ident, $clear:ident, $ty:ty, ($($arg:ty),*)) => {
        #[doc = concat!("Install the `", stringify!($field), "` handler, replacing any previous one.")]
        pub fn $set(&mut self, handler: impl Fn($($arg),*) + Send + 'static) {
            self.$field = Some(Box::new(handler));
        }

        #[doc = concat!("Remove the `", stringify!($field), "` handler, returning it.")]
        pub fn $clear(&mut self) -> Option<$ty> {
            self.$field.take()
        }

        #[doc = concat!("The installed `", stringify!($field), "` handler, if any.")]
        pub fn $field(&self) -> Option<&$ty> {
            self.$field.as_ref()
        }
    };
}

/// The seven handler slots.
#[derive(Default)]
pub struct Handlers {
    suite_start: Option<SuiteHandler>,
    test_start: Option<TestStartHandler>,
    test_complete: Option<TestCompleteHandler>,
    suite_complete: Option<SuiteCompleteHandler>,
    all_complete: Option<AllCompleteHandler>,
    suite_init_failure: Option<SuiteHandler>,
    suite_cleanup_failure: Option<SuiteHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Handlers::default()
    }

    handler_slot!(suite_start, set_suite_start, clear_suite_start, SuiteHandler, (&Suite));
    handler_slot!(test_start, set_test_start, clear_test_start, TestStartHandler, (&Test, &Suite));
    handler_slot!(
        test_complete,
        set_test_complete,
        clear_test_complete,
        TestCompleteHandler,
        (&Test, &Suite, &[FailureRecord])
    );
    handler_slot!(
        suite_complete,
        set_suite_complete,
        clear_suite_complete,
        SuiteCompleteHandler,
        (&Suite, &[FailureRecord])
    );
    handler_slot!(all_complete, set_all_complete, clear_all_complete, AllCompleteHandler, (&[FailureRecord]));
    handler_slot!(
        suite_init_failure,
        set_suite_init_failure,
        clear_suite_init_failure,
        SuiteHandler,
        (&Suite)
    );
    handler_slot!(
        suite_cleanup_failure,
        set_suite_cleanup_failure,
        clear_suite_cleanup_failure,
        SuiteHandler,
        (&Suite)
    );

    /// Remove every handler.
    pub fn clear(&mut self) {
        *self = Handlers::default();
    }

    pub(crate) fn on_suite_start(&self, suite: &Suite) {
        if let Some(handler) = &self.suite_start {
            handler(suite);
        }
    }

    pub(crate) fn on_test_start(&self, test: &Test, suite: &Suite) {
        if let Some(handler) = &self.test_start {
            handler(test, suite);
        }
    }

    pub(crate) fn on_test_complete(&self, test: &Test, suite: &Suite, failures: &[FailureRecord]) {
        if let Some(handler) = &self.test_complete {
            handler(test, suite, failures);
        }
    }

    pub(crate) fn on_suite_complete(&self, suite: &Suite, failures: &[FailureRecord]) {
        if let Some(handler) = &self.suite_complete {
            handler(suite, failures);
        }
    }

    pub(crate) fn on_all_complete(&self, failures: &[FailureRecord]) {
        if let Some(handler) = &self.all_complete {
            handler(failures);
        }
    }

    pub(crate) fn on_suite_init_failure(&self, suite: &Suite) {
        if let Some(handler) = &self.suite_init_failure {
            handler(suite);
        }
    }

    pub(crate) fn on_suite_cleanup_failure(&self, suite: &Suite) {
        if let Some(handler) = &self.suite_cleanup_failure {
            handler(suite);
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("suite_start", &self.suite_start.is_some())
            .field("test_start", &self.test_start.is_some())
            .field("test_complete", &self.test_complete.is_some())
            .field("suite_complete", &self.suite_complete.is_some())
            .field("all_complete", &self.all_complete.is_some())
            .field("suite_init_failure", &self.suite_init_failure.is_some())
            .field("suite_cleanup_failure", &self.suite_cleanup_failure.is_some())
            .finish()
    }
}
