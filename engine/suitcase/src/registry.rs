//! Test registry: suites, tests, and their registration order.
//!
//! A [`Registry`] owns two bounded pools, one for suites and one for tests.
//! Suites run in pool order, which is registration order. The tests of a
//! suite form a chain threaded through the test pool (`first`/`last` on the
//! suite, `next`/`prev` on each test), so appending is O(1) and needs no
//! per-suite allocation.
//!
//! Handles ([`SuiteId`], [`TestId`]) carry the stamp of the registry that
//! issued them; a handle presented to a different registry resolves to
//! nothing instead of aliasing one of its slots.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use suitcase_pool::{Pool, Slot};

use crate::config::Limits;
use crate::context::{TestContext, TestResult};
use crate::error::{Added, EngineError};
use crate::text::{bounded, names_match};

/// Body of a test.
pub type TestFn = Arc<dyn Fn(&mut TestContext<'_>) -> TestResult + Send + Sync>;
/// Suite init or cleanup function. A nonzero return reports failure.
pub type SuiteFn = Arc<dyn Fn() -> i32 + Send + Sync>;
/// Per-test setup or teardown function.
pub type FixtureFn = Arc<dyn Fn() + Send + Sync>;

static NEXT_STAMP: AtomicU32 = AtomicU32::new(1);

/// Handle to a suite in a [`Registry`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct SuiteId {
    stamp: u32,
    slot: Slot,
}

impl fmt::Debug for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SuiteId({}:{})", self.stamp, self.slot.raw())
    }
}

/// Handle to a test in a [`Registry`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TestId {
    stamp: u32,
    slot: Slot,
}

impl fmt::Debug for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestId({}:{})", self.stamp, self.slot.raw())
    }
}

/// Optional suite-level and per-test hooks.
#[derive(Clone, Default)]
pub struct SuiteHooks {
    pub init: Option<SuiteFn>,
    pub cleanup: Option<SuiteFn>,
    pub setup: Option<FixtureFn>,
    pub teardown: Option<FixtureFn>,
}

impl SuiteHooks {
    pub fn new() -> Self {
        SuiteHooks::default()
    }

    /// Run once before the suite's tests; nonzero skips the suite.
    #[must_use]
    pub fn init(mut self, f: impl Fn() -> i32 + Send + Sync + 'static) -> Self {
        self.init = Some(Arc::new(f));
        self
    }

    /// Run once after the suite's tests; nonzero records a failure.
    #[must_use]
    pub fn cleanup(mut self, f: impl Fn() -> i32 + Send + Sync + 'static) -> Self {
        self.cleanup = Some(Arc::new(f));
        self
    }

    /// Run before every test of the suite.
    #[must_use]
    pub fn setup(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.setup = Some(Arc::new(f));
        self
    }

    /// Run after every test of the suite, even one aborted by a fatal assertion.
    #[must_use]
    pub fn teardown(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.teardown = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SuiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteHooks")
            .field("init", &self.init.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// A named, ordered collection of tests.
pub struct Suite {
    id: SuiteId,
    name: String,
    active: bool,
    hooks: SuiteHooks,
    first: Option<Slot>,
    last: Option<Slot>,
    test_count: u32,
    /// Tests that added failures during the last run of this suite.
    tests_failed: u32,
    /// Tests that ran without adding failures during the last run.
    tests_succeeded: u32,
}

impl Suite {
    pub fn id(&self) -> SuiteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn hooks(&self) -> &SuiteHooks {
        &self.hooks
    }

    /// Number of tests registered in this suite.
    pub fn test_count(&self) -> u32 {
        self.test_count
    }

    pub fn tests_failed(&self) -> u32 {
        self.tests_failed
    }

    pub fn tests_succeeded(&self) -> u32 {
        self.tests_succeeded
    }

    pub(crate) fn reset_tallies(&mut self) {
        self.tests_failed = 0;
        self.tests_succeeded = 0;
    }

    pub(crate) fn tally(&mut self, failed: bool) {
        if failed {
            self.tests_failed += 1;
        } else {
            self.tests_succeeded += 1;
        }
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("tests", &self.test_count)
            .finish_non_exhaustive()
    }
}

/// A named test function inside a suite.
pub struct Test {
    id: TestId,
    suite: SuiteId,
    name: String,
    active: bool,
    func: TestFn,
    next: Option<Slot>,
    prev: Option<Slot>,
}

impl Test {
    pub fn id(&self) -> TestId {
        self.id
    }

    /// Suite this test was registered in.
    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn func(&self) -> &TestFn {
        &self.func
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Static description of a test for bulk registration.
#[derive(Clone)]
pub struct TestInfo {
    pub name: &'static str,
    pub func: TestFn,
}

impl TestInfo {
    pub fn new(
        name: &'static str,
        func: impl Fn(&mut TestContext<'_>) -> TestResult + Send + Sync + 'static,
    ) -> Self {
        TestInfo {
            name,
            func: Arc::new(func),
        }
    }
}

/// Static description of a suite and its tests for bulk registration.
#[derive(Clone)]
pub struct SuiteInfo {
    pub name: &'static str,
    pub hooks: SuiteHooks,
    pub tests: Vec<TestInfo>,
}

/// Ordered collection of suites.
pub struct Registry {
    stamp: u32,
    max_name_len: usize,
    suites: Pool<Suite>,
    tests: Pool<Test>,
}

impl Registry {
    /// Create an empty registry with pools sized by `limits`.
    ///
    /// Registries made this way are independent of any engine until they
    /// are installed with [`Engine::swap_registry`](crate::Engine::swap_registry).
    pub fn new(limits: &Limits) -> Result<Self, EngineError> {
        Ok(Registry {
            stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
            max_name_len: limits.max_name_len,
            suites: Pool::with_capacity(limits.max_suites)?,
            tests: Pool::with_capacity(limits.max_tests)?,
        })
    }

    /// Number of registered suites.
    pub fn suite_count(&self) -> u32 {
        count(self.suites.len())
    }

    /// Number of registered tests across all suites.
    pub fn test_count(&self) -> u32 {
        count(self.tests.len())
    }

    /// Register a suite at the end of the run order.
    ///
    /// A suite whose name is already taken is still added; the result is
    /// then [`Added::Duplicate`] and only the first suite of that name stays
    /// reachable through [`find_suite`](Self::find_suite).
    pub fn add_suite(&mut self, name: &str, hooks: SuiteHooks) -> Result<Added<SuiteId>, EngineError> {
        if name.is_empty() {
            return Err(EngineError::NoSuiteName);
        }
        let duplicate = self.find_suite(name).is_some();

        let stamp = self.stamp;
        let next_slot = Slot::new(count(self.suites.len()));
        let suite = Suite {
            id: SuiteId {
                stamp,
                slot: next_slot,
            },
            name: bounded(name, self.max_name_len),
            active: true,
            hooks,
            first: None,
            last: None,
            test_count: 0,
            tests_failed: 0,
            tests_succeeded: 0,
        };
        let slot = self.suites.alloc(suite).map_err(|err| {
            tracing::warn!(suite = name, %err, "suite pool exhausted");
            EngineError::from(err)
        })?;
        debug_assert_eq!(slot, next_slot);

        let id = SuiteId { stamp, slot };
        tracing::trace!(suite = name, ?id, duplicate, "registered suite");
        Ok(if duplicate {
            Added::Duplicate(id)
        } else {
            Added::Unique(id)
        })
    }

    /// Register a test at the end of `suite`.
    pub fn add_test(
        &mut self,
        suite: SuiteId,
        name: &str,
        func: impl Fn(&mut TestContext<'_>) -> TestResult + Send + Sync + 'static,
    ) -> Result<Added<TestId>, EngineError> {
        self.add_test_fn(suite, name, Arc::new(func))
    }

    /// Register an already shared test function at the end of `suite`.
    pub fn add_test_fn(&mut self, suite: SuiteId, name: &str, func: TestFn) -> Result<Added<TestId>, EngineError> {
        let suite_slot = self.suite_slot(suite).ok_or(EngineError::NoSuite)?;
        if name.is_empty() {
            return Err(EngineError::NoTestName);
        }
        let duplicate = self.find_test(suite, name).is_some();

        let stamp = self.stamp;
        let next_slot = Slot::new(count(self.tests.len()));
        let test = Test {
            id: TestId {
                stamp,
                slot: next_slot,
            },
            suite,
            name: bounded(name, self.max_name_len),
            active: true,
            func,
            next: None,
            prev: None,
        };
        let slot = self.tests.alloc(test).map_err(|err| {
            tracing::warn!(test = name, %err, "test pool exhausted");
            EngineError::from(err)
        })?;
        debug_assert_eq!(slot, next_slot);
        self.link_test(suite_slot, slot);

        let id = TestId { stamp, slot };
        tracing::trace!(test = name, ?id, duplicate, "registered test");
        Ok(if duplicate {
            Added::Duplicate(id)
        } else {
            Added::Unique(id)
        })
    }

    /// Append `test` to the chain of `suite`.
    fn link_test(&mut self, suite: Slot, test: Slot) {
        let prev = self.suites[suite].last;
        {
            let entry = &mut self.tests[test];
            assert!(
                entry.next.is_none() && entry.prev.is_none(),
                "test `{}` is already linked into a suite",
                entry.name
            );
            entry.prev = prev;
        }
        if let Some(prev) = prev {
            self.tests[prev].next = Some(test);
        }
        let owner = &mut self.suites[suite];
        if owner.first.is_none() {
            owner.first = Some(test);
        }
        owner.last = Some(test);
        owner.test_count += 1;
    }

    /// Register every suite and test described by `infos`, in order.
    ///
    /// Stops at the first hard error. Duplicate names are tolerated.
    pub fn register_suites(&mut self, infos: &[SuiteInfo]) -> Result<(), EngineError> {
        for info in infos {
            let suite = self.add_suite(info.name, info.hooks.clone())?.id();
            for test in &info.tests {
                self.add_test_fn(suite, test.name, Arc::clone(&test.func))?;
            }
        }
        Ok(())
    }

    /// First suite whose name matches `name`, ignoring ASCII case.
    pub fn find_suite(&self, name: &str) -> Option<SuiteId> {
        let name = bounded(name, self.max_name_len);
        self.suites
            .iter()
            .find(|suite| names_match(&suite.name, &name))
            .map(Suite::id)
    }

    /// First test of `suite` whose name matches `name`, ignoring ASCII case.
    pub fn find_test(&self, suite: SuiteId, name: &str) -> Option<TestId> {
        let name = bounded(name, self.max_name_len);
        self.tests(suite)
            .find(|test| names_match(&test.name, &name))
            .map(Test::id)
    }

    pub fn suite(&self, id: SuiteId) -> Option<&Suite> {
        self.suite_slot(id).map(|slot| &self.suites[slot])
    }

    pub fn test(&self, id: TestId) -> Option<&Test> {
        self.test_slot(id).map(|slot| &self.tests[slot])
    }

    /// Whether `test` was registered in `suite`.
    pub fn contains_test(&self, suite: SuiteId, test: TestId) -> bool {
        self.suite_slot(suite).is_some() && self.test(test).is_some_and(|t| t.suite == suite)
    }

    pub fn set_suite_active(&mut self, id: SuiteId, active: bool) -> Result<(), EngineError> {
        let slot = self.suite_slot(id).ok_or(EngineError::NoSuite)?;
        self.suites[slot].active = active;
        Ok(())
    }

    pub fn set_test_active(&mut self, id: TestId, active: bool) -> Result<(), EngineError> {
        let slot = self.test_slot(id).ok_or(EngineError::NoTest)?;
        self.tests[slot].active = active;
        Ok(())
    }

    /// Suites in registration order.
    pub fn suites(&self) -> impl ExactSizeIterator<Item = &Suite> + '_ {
        self.suites.iter()
    }

    /// Tests of `suite` in registration order. Empty for a foreign handle.
    pub fn tests(&self, suite: SuiteId) -> Tests<'_> {
        Tests {
            registry: self,
            cursor: self.suite(suite).and_then(|s| s.first),
        }
    }

    /// Handle of the suite at `position` in run order.
    pub(crate) fn suite_at(&self, position: usize) -> Option<SuiteId> {
        self.suites.as_slice().get(position).map(Suite::id)
    }

    /// Test registered after `test` in the same suite.
    pub(crate) fn next_test(&self, test: TestId) -> Option<TestId> {
        let next = self.test(test)?.next?;
        Some(self.tests[next].id)
    }

    /// First test of `suite`.
    pub(crate) fn first_test(&self, suite: SuiteId) -> Option<TestId> {
        let first = self.suite(suite)?.first?;
        Some(self.tests[first].id)
    }

    fn suite_slot(&self, id: SuiteId) -> Option<Slot> {
        (id.stamp == self.stamp && id.slot.index() < self.suites.len()).then_some(id.slot)
    }

    fn test_slot(&self, id: TestId) -> Option<Slot> {
        (id.stamp == self.stamp && id.slot.index() < self.tests.len()).then_some(id.slot)
    }
}

impl Index<SuiteId> for Registry {
    type Output = Suite;

    fn index(&self, id: SuiteId) -> &Suite {
        match self.suite(id) {
            Some(suite) => suite,
            None => panic!("{id:?} does not belong to this registry"),
        }
    }
}

impl IndexMut<SuiteId> for Registry {
    fn index_mut(&mut self, id: SuiteId) -> &mut Suite {
        match self.suite_slot(id) {
            Some(slot) => &mut self.suites[slot],
            None => panic!("{id:?} does not belong to this registry"),
        }
    }
}

impl Index<TestId> for Registry {
    type Output = Test;

    fn index(&self, id: TestId) -> &Test {
        match self.test(id) {
            Some(test) => test,
            None => panic!("{id:?} does not belong to this registry"),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("stamp", &self.stamp)
            .field("suites", &self.suites.len())
            .field("tests", &self.tests.len())
            .finish()
    }
}

/// Iterator over the tests of one suite.
pub struct Tests<'a> {
    registry: &'a Registry,
    cursor: Option<Slot>,
}

impl<'a> Iterator for Tests<'a> {
    type Item = &'a Test;

    fn next(&mut self) -> Option<&'a Test> {
        let test = &self.registry.tests[self.cursor?];
        self.cursor = test.next;
        Some(test)
    }
}

/// Pool lengths are bounded by a `u32` capacity.
fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
