//! Engine configuration.

/// Capacities of the engine's object pools and the text length cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Suites a single registry can hold.
    pub max_suites: usize,
    /// Tests a single registry can hold, across all of its suites.
    pub max_tests: usize,
    /// Failure records kept for one run. Further failures are dropped.
    pub max_failures: usize,
    /// Maximum length in bytes of suite/test names and of failure
    /// condition and file texts. Longer text is cut at a char boundary.
    pub max_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_suites: 64,
            max_tests: 512,
            max_failures: 512,
            max_name_len: 128,
        }
    }
}

/// What the run loop does after a suite or test reports a non-success code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorAction {
    /// Keep going; the first error is still reported at the end.
    #[default]
    Ignore,
    /// Stop iterating suites and tests after the first error.
    Fail,
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Whether inactive suites and tests produce failure records.
    pub fail_on_inactive: bool,
    pub error_action: ErrorAction,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            limits: Limits::default(),
            fail_on_inactive: true,
            error_action: ErrorAction::Ignore,
        }
    }
}

impl EngineConfig {
    /// Default configuration with custom pool limits.
    pub fn with_limits(limits: Limits) -> Self {
        EngineConfig {
            limits,
            ..EngineConfig::default()
        }
    }
}
