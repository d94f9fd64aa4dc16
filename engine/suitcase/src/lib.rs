//! Registry and execution engine for native unit tests.
//!
//! Suites and their tests are registered into a [`Registry`], run in
//! registration order by an [`Engine`], and reported through a
//! [`RunSummary`], an ordered list of [`FailureRecord`]s, and optional
//! lifecycle [`Handlers`].
//!
//! # Example
//!
//! ```
//! use suitcase::{unit_assert, unit_assert_fatal, Engine, EngineConfig, SuiteHooks};
//!
//! # fn main() -> Result<(), suitcase::EngineError> {
//! let mut engine = Engine::new(EngineConfig::default())?;
//! engine.initialize_registry()?;
//!
//! let math = engine.add_suite("Math", SuiteHooks::new())?.id();
//! engine.add_test(math, "AddsCorrectly", |t| {
//!     unit_assert!(t, 1 + 1 == 2);
//!     Ok(())
//! })?;
//! engine.add_test(math, "DivByZeroGuard", |t| {
//!     let denom = 0;
//!     unit_assert_fatal!(t, denom != 0);
//!     unreachable!("fatal assertion aborts the test");
//! })?;
//!
//! engine.run_all()?;
//! assert_eq!(engine.run_summary().tests_failed, 1);
//! assert_eq!(engine.failure_list().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Failure channels
//!
//! Registration and run-control calls return [`EngineError`] and leave an
//! [`ErrorCode`] behind ([`Engine::last_error`]). Conditions found while
//! running (assertion failures, failing suite init/cleanup, inactive suites
//! or tests) are collected as failure records and never stop the run,
//! except that a failing fatal assertion ends its own test.

mod config;
mod context;
mod engine;
mod error;
mod failure;
pub mod global;
mod handlers;
mod registry;
mod report;
mod run;
mod summary;
mod text;

pub use config::{EngineConfig, ErrorAction, Limits};
pub use context::{Aborted, TestContext, TestResult};
pub use engine::Engine;
pub use error::{Added, EngineError, ErrorCode};
pub use failure::{FailureKind, FailureRecord, FailureStore, SYSTEM_FILE};
pub use handlers::{
    AllCompleteHandler, Handlers, SuiteCompleteHandler, SuiteHandler, TestCompleteHandler,
    TestStartHandler,
};
pub use registry::{
    FixtureFn, Registry, Suite, SuiteFn, SuiteHooks, SuiteId, SuiteInfo, Test, TestFn, TestId,
    TestInfo, Tests,
};
pub use report::run_results_table;
pub use summary::RunSummary;
pub use suitcase_pool::PoolError;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=suitcase=debug` (suite and test spans) or
/// `RUST_LOG=suitcase=trace` (every assertion).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};
        use tracing_tree::HierarchicalLayer;

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        }
    });
}
