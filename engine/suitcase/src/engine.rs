//! The engine: active registry slot, policies, handlers and run results.

use crate::config::{EngineConfig, ErrorAction};
use crate::context::{TestContext, TestResult};
use crate::error::{code_of, code_of_run, Added, EngineError, ErrorCode};
use crate::failure::{FailureRecord, FailureStore};
use crate::handlers::Handlers;
use crate::registry::{Registry, SuiteHooks, SuiteId, SuiteInfo, TestId};
use crate::report::run_results_table;
use crate::run::RunState;
use crate::summary::RunSummary;

/// Registry plus execution state.
///
/// Registration and run control both need `&mut Engine`, and a running
/// test only ever sees its [`TestContext`], so the registry cannot change
/// while a run is in progress and runs cannot nest.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) registry: Option<Registry>,
    pub(crate) handlers: Handlers,
    pub(crate) state: RunState,
    pub(crate) last_error: ErrorCode,
}

impl Engine {
    /// Create an engine with no active registry.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let state = RunState::new(&config.limits)?;
        Ok(Engine {
            config,
            registry: None,
            handlers: Handlers::new(),
            state,
            last_error: ErrorCode::Success,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Registry lifecycle --

    /// Replace any active registry with a fresh, empty one.
    pub fn initialize_registry(&mut self) -> Result<(), EngineError> {
        if self.registry.is_some() {
            self.cleanup_registry();
        }
        let result = Registry::new(&self.config.limits).map(|registry| {
            self.registry = Some(registry);
        });
        self.last_error = match &result {
            Ok(()) => ErrorCode::Success,
            Err(err) => err.code(),
        };
        tracing::debug!(ok = result.is_ok(), "registry initialized");
        result
    }

    pub fn registry_initialized(&self) -> bool {
        self.registry.is_some()
    }

    /// Drop the active registry and the results of the last run.
    ///
    /// Calling this without an active registry is harmless.
    pub fn cleanup_registry(&mut self) {
        self.last_error = ErrorCode::Success;
        self.registry = None;
        self.state.clear_previous_results();
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    pub fn registry_mut(&mut self) -> Option<&mut Registry> {
        self.registry.as_mut()
    }

    /// Install `registry` as the active one, returning the previous registry
    /// to the caller.
    pub fn swap_registry(&mut self, registry: Option<Registry>) -> Option<Registry> {
        self.last_error = ErrorCode::Success;
        std::mem::replace(&mut self.registry, registry)
    }

    /// Create a registry that is not installed in this engine, sized by this
    /// engine's limits.
    pub fn create_registry(&self) -> Result<Registry, EngineError> {
        Registry::new(&self.config.limits)
    }

    /// Dispose of a registry obtained from [`create_registry`](Self::create_registry)
    /// or [`swap_registry`](Self::swap_registry).
    pub fn destroy_registry(registry: Registry) {
        tracing::trace!(?registry, "registry destroyed");
        drop(registry);
    }

    // -- Registration --

    /// Register a suite in the active registry.
    pub fn add_suite(&mut self, name: &str, hooks: SuiteHooks) -> Result<Added<SuiteId>, EngineError> {
        let result = match self.registry.as_mut() {
            Some(registry) => registry.add_suite(name, hooks),
            None => Err(EngineError::NoRegistry),
        };
        self.last_error = code_of(&result, ErrorCode::DuplicateSuite);
        result
    }

    /// Register a test in `suite` of the active registry.
    pub fn add_test(
        &mut self,
        suite: SuiteId,
        name: &str,
        func: impl Fn(&mut TestContext<'_>) -> TestResult + Send + Sync + 'static,
    ) -> Result<Added<TestId>, EngineError> {
        let result = match self.registry.as_mut() {
            Some(registry) => registry.add_test(suite, name, func),
            None => Err(EngineError::NoRegistry),
        };
        self.last_error = code_of(&result, ErrorCode::DuplicateTest);
        result
    }

    /// Register a table of suites and tests in the active registry.
    pub fn register_suites(&mut self, infos: &[SuiteInfo]) -> Result<(), EngineError> {
        let result = match self.registry.as_mut() {
            Some(registry) => registry.register_suites(infos),
            None => Err(EngineError::NoRegistry),
        };
        self.last_error = match &result {
            Ok(()) => ErrorCode::Success,
            Err(err) => err.code(),
        };
        result
    }

    /// Look up a suite by name. `Ok(None)` means no suite has that name.
    pub fn get_suite(&mut self, name: &str) -> Result<Option<SuiteId>, EngineError> {
        let result = match self.registry.as_ref() {
            None => Err(EngineError::NoRegistry),
            Some(_) if name.is_empty() => Err(EngineError::NoSuiteName),
            Some(registry) => Ok(registry.find_suite(name)),
        };
        self.last_error = result.as_ref().err().map_or(ErrorCode::Success, EngineError::code);
        result
    }

    /// Look up a test of `suite` by name. `Ok(None)` means not found.
    pub fn get_test(&mut self, suite: SuiteId, name: &str) -> Result<Option<TestId>, EngineError> {
        let result = match self.registry.as_ref() {
            None => Err(EngineError::NoRegistry),
            Some(registry) if registry.suite(suite).is_none() => Err(EngineError::NoSuite),
            Some(_) if name.is_empty() => Err(EngineError::NoTestName),
            Some(registry) => Ok(registry.find_test(suite, name)),
        };
        self.last_error = result.as_ref().err().map_or(ErrorCode::Success, EngineError::code);
        result
    }

    pub fn set_suite_active(&mut self, suite: SuiteId, active: bool) -> Result<(), EngineError> {
        let result = match self.registry.as_mut() {
            Some(registry) => registry.set_suite_active(suite, active),
            None => Err(EngineError::NoRegistry),
        };
        self.last_error = code_of_run(&result);
        result
    }

    pub fn set_test_active(&mut self, test: TestId, active: bool) -> Result<(), EngineError> {
        let result = match self.registry.as_mut() {
            Some(registry) => registry.set_test_active(test, active),
            None => Err(EngineError::NoRegistry),
        };
        self.last_error = code_of_run(&result);
        result
    }

    // -- Policy --

    /// Whether inactive suites and tests are recorded as failures.
    pub fn fail_on_inactive(&self) -> bool {
        self.config.fail_on_inactive
    }

    pub fn set_fail_on_inactive(&mut self, fail: bool) {
        self.config.fail_on_inactive = fail;
    }

    pub fn error_action(&self) -> ErrorAction {
        self.config.error_action
    }

    pub fn set_error_action(&mut self, action: ErrorAction) {
        self.config.error_action = action;
    }

    // -- Handlers --

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    // -- Introspection --

    /// Code left by the last registration or run-control call.
    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn is_test_running(&self) -> bool {
        self.state.running
    }

    /// Suite being run. Always `None` outside a run.
    pub fn current_suite(&self) -> Option<SuiteId> {
        self.state.current_suite
    }

    /// Test being run. Always `None` outside a run.
    pub fn current_test(&self) -> Option<TestId> {
        self.state.current_test
    }

    pub fn run_summary(&self) -> &RunSummary {
        &self.state.summary
    }

    /// Failures recorded by the most recent run, in the order they occurred.
    pub fn failure_list(&self) -> &[FailureRecord] {
        self.state.failures.as_slice()
    }

    pub fn failure_store(&self) -> &FailureStore {
        &self.state.failures
    }

    /// Elapsed seconds of the most recent run.
    pub fn elapsed_time(&self) -> f64 {
        self.state.summary.elapsed_secs()
    }

    /// Fixed-width table of suite, test and assertion counts for the most
    /// recent run.
    pub fn run_results(&self) -> Result<String, EngineError> {
        let registry = self.registry.as_ref().ok_or(EngineError::NoRegistry)?;
        Ok(run_results_table(
            &self.state.summary,
            registry.suite_count(),
            registry.test_count(),
        ))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("handlers", &self.handlers)
            .field("summary", &self.state.summary)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
