//! Process-wide engine.
//!
//! For callers that want a single implicit engine per process. All access
//! goes through [`with_engine`]; the engine is created on first use with
//! [`EngineConfig::default`] unless [`configure`] ran first.
//!
//! The facade is meant for one test runner on one thread. Using it while it
//! is already in use, whether by calling back into it from a test body or
//! handler or by using it from a second thread at the same time, is a
//! contract violation and panics instead of blocking.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::registry::{SuiteId, TestId};

static ENGINE: Mutex<Option<Engine>> = parking_lot::const_mutex(None);
/// Mirrors [`Engine::is_test_running`] of the process-wide engine.
static RUNNING: AtomicBool = AtomicBool::new(false);

fn new_engine(config: EngineConfig) -> Result<Engine, EngineError> {
    let mut engine = Engine::new(config)?;
    engine.state.running_mirror = Some(&RUNNING);
    Ok(engine)
}

/// Run `f` with exclusive access to the process-wide engine.
///
/// Only one caller may hold the engine at a time. A nested call from inside
/// `f`, or a concurrent call from another thread, panics.
pub fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Result<R, EngineError> {
    let Some(mut guard) = ENGINE.try_lock() else {
        panic!(
            "the process-wide engine is already in use, either re-entered from a test or \
             handler or used from another thread; it allows one caller at a time"
        );
    };
    let engine = match guard.take() {
        Some(engine) => engine,
        None => new_engine(EngineConfig::default())?,
    };
    Ok(f(guard.insert(engine)))
}

/// Replace the process-wide engine with a fresh one built from `config`.
///
/// Any registry and results held by the previous engine are discarded.
pub fn configure(config: EngineConfig) -> Result<(), EngineError> {
    let engine = new_engine(config)?;
    let Some(mut guard) = ENGINE.try_lock() else {
        panic!("cannot reconfigure the process-wide engine while it is in use");
    };
    *guard = Some(engine);
    Ok(())
}

/// Whether the process-wide engine is running tests.
///
/// Readable from anywhere, including from inside a running test. Like
/// [`Engine::is_test_running`], it is already false when the all-complete
/// handler runs.
pub fn is_test_running() -> bool {
    RUNNING.load(Ordering::SeqCst)
}

pub fn initialize_registry() -> Result<(), EngineError> {
    with_engine(Engine::initialize_registry)?
}

pub fn cleanup_registry() -> Result<(), EngineError> {
    with_engine(Engine::cleanup_registry)
}

pub fn run_all() -> Result<(), EngineError> {
    with_engine(Engine::run_all)?
}

pub fn run_suite(suite: SuiteId) -> Result<(), EngineError> {
    with_engine(|engine| engine.run_suite(suite))?
}

pub fn run_test(suite: SuiteId, test: TestId) -> Result<(), EngineError> {
    with_engine(|engine| engine.run_test(suite, test))?
}
