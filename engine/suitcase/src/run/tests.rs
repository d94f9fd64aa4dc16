use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::error::ErrorCode;
use crate::registry::SuiteHooks;
use crate::{unit_assert, unit_assert_eq, unit_assert_fatal, unit_fail};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    engine.initialize_registry().unwrap();
    engine
}

fn kinds(engine: &Engine) -> Vec<FailureKind> {
    engine.failure_list().iter().map(|f| f.kind).collect()
}

#[test]
fn test_passing_assertion_scenario() {
    let mut engine = engine();
    let math = engine.add_suite("Math", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(math, "AddsCorrectly", |t| {
            unit_assert!(t, 2 + 2 == 4);
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    let summary = engine.run_summary();
    assert_eq!(summary.tests_run, 1);
    assert_eq!(summary.asserts, 1);
    assert_eq!(summary.asserts_failed, 0);
    assert_eq!(summary.failure_records, 0);
    assert!(engine.failure_list().is_empty());
}

#[test]
fn test_failing_fatal_assertion_scenario() {
    let mut engine = engine();
    let math = engine.add_suite("Math", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(math, "DivByZeroGuard", |t| {
            let denom = 0;
            t.assert_fatal(denom != 0, 42, "denom != 0", "math.rs")?;
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    let summary = engine.run_summary();
    assert_eq!(summary.asserts_failed, 1);
    assert_eq!(summary.tests_failed, 1);
    assert_eq!(summary.failure_records, 1);
    let record = &engine.failure_list()[0];
    assert_eq!(record.kind, FailureKind::AssertFailed);
    assert_eq!(record.line, 42);
    assert_eq!(record.condition, "denom != 0");
    assert_eq!(record.file, "math.rs");
    assert_eq!(record.suite_name, "Math");
    assert_eq!(record.test_name.as_deref(), Some("DivByZeroGuard"));
}

#[test]
fn test_fatal_abort_skips_rest_of_body_but_not_teardown() {
    let log = new_log();
    let mut engine = engine();
    let hooks = {
        let (setup_log, teardown_log) = (log.clone(), log.clone());
        SuiteHooks::new()
            .setup(move || setup_log.lock().push("setup".into()))
            .teardown(move || teardown_log.lock().push("teardown".into()))
    };
    let suite = engine.add_suite("s", hooks).unwrap().id();

    let body_log = log.clone();
    engine
        .add_test(suite, "aborts", move |t| {
            body_log.lock().push("before".into());
            unit_assert_fatal!(t, 1 > 2);
            body_log.lock().push("after".into());
            Ok(())
        })
        .unwrap();
    let next_log = log.clone();
    engine
        .add_test(suite, "next", move |_| {
            next_log.lock().push("next".into());
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    assert_eq!(
        entries(&log),
        vec!["setup", "before", "teardown", "setup", "next", "teardown"]
    );
    assert_eq!(engine.run_summary().tests_run, 2);
    assert_eq!(engine.run_summary().tests_failed, 1);
}

#[test]
fn test_non_fatal_failure_continues_body() {
    let log = new_log();
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let body_log = log.clone();
    engine
        .add_test(suite, "keeps going", move |t| {
            if !unit_assert_eq!(t, 1 + 1, 3) {
                body_log.lock().push("saw failure".into());
            }
            unit_assert!(t, true);
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    assert_eq!(entries(&log), vec!["saw failure"]);
    let summary = engine.run_summary();
    assert_eq!((summary.asserts, summary.asserts_failed), (2, 1));
    assert_eq!(
        engine.failure_list()[0].condition,
        "unit_assert_eq!(1 + 1, 3)"
    );
}

#[test]
fn test_inactive_suite_recorded_when_failing_on_inactive() {
    let ran = new_log();
    let mut engine = engine();
    let suite = engine.add_suite("off", SuiteHooks::new()).unwrap().id();
    let body_log = ran.clone();
    engine
        .add_test(suite, "t", move |_| {
            body_log.lock().push("ran".into());
            Ok(())
        })
        .unwrap();
    engine.set_suite_active(suite, false).unwrap();

    let err = engine.run_all().unwrap_err();

    assert_eq!(err, EngineError::SuiteInactive);
    assert_eq!(kinds(&engine), vec![FailureKind::SuiteInactive]);
    assert_eq!(engine.run_summary().suites_inactive, 1);
    assert_eq!(engine.run_summary().tests_run, 0);
    assert!(entries(&ran).is_empty());
}

#[test]
fn test_inactive_suite_silent_when_not_failing_on_inactive() {
    let mut engine = engine();
    engine.set_fail_on_inactive(false);
    let suite = engine.add_suite("off", SuiteHooks::new()).unwrap().id();
    engine.add_test(suite, "t", |_| Ok(())).unwrap();
    engine.set_suite_active(suite, false).unwrap();

    engine.run_all().unwrap();

    assert!(engine.failure_list().is_empty());
    assert_eq!(engine.run_summary().suites_inactive, 1);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_inactive_test_is_counted_and_skipped() {
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let off = engine.add_test(suite, "off", |_| Ok(())).unwrap().id();
    engine.add_test(suite, "on", |_| Ok(())).unwrap();
    engine.set_test_active(off, false).unwrap();

    let err = engine.run_all().unwrap_err();

    assert_eq!(err, EngineError::TestInactive);
    let summary = engine.run_summary();
    assert_eq!(summary.tests_inactive, 1);
    assert_eq!(summary.tests_run, 1);
    assert_eq!(summary.tests_failed, 0);
    assert_eq!(kinds(&engine), vec![FailureKind::TestInactive]);
    assert_eq!(engine.failure_list()[0].test, Some(off));
}

#[test]
fn test_init_failure_skips_tests_and_cleanup() {
    let log = new_log();
    let mut engine = engine();
    let cleanup_log = log.clone();
    let hooks = SuiteHooks::new()
        .init(|| 1)
        .cleanup(move || {
            cleanup_log.lock().push("cleanup".into());
            0
        });
    let suite = engine.add_suite("broken", hooks).unwrap().id();
    let body_log = log.clone();
    engine
        .add_test(suite, "t", move |_| {
            body_log.lock().push("test".into());
            Ok(())
        })
        .unwrap();

    let err = engine.run_all().unwrap_err();

    assert_eq!(err, EngineError::SuiteInitFailed);
    assert!(entries(&log).is_empty());
    let summary = engine.run_summary();
    assert_eq!(summary.suites_failed, 1);
    assert_eq!(summary.suites_run, 0);
    assert_eq!(summary.tests_run, 0);
    assert_eq!(kinds(&engine), vec![FailureKind::SuiteInitFailed]);
    let record = &engine.failure_list()[0];
    assert_eq!(record.condition, "Suite Initialization failed - Suite Skipped");
    assert_eq!(record.file, SYSTEM_FILE);
    assert_eq!(record.line, 0);
    assert_eq!(record.test, None);
}

#[test]
fn test_cleanup_failure_is_recorded_after_tests() {
    let mut engine = engine();
    let suite = engine
        .add_suite("s", SuiteHooks::new().init(|| 0).cleanup(|| -1))
        .unwrap()
        .id();
    engine.add_test(suite, "passes", |_| Ok(())).unwrap();

    let err = engine.run_all().unwrap_err();

    assert_eq!(err, EngineError::SuiteCleanupFailed);
    let summary = engine.run_summary();
    assert_eq!(summary.suites_run, 1);
    assert_eq!(summary.suites_failed, 1);
    assert_eq!(summary.tests_run, 1);
    assert_eq!(summary.tests_failed, 0);
    assert_eq!(kinds(&engine), vec![FailureKind::SuiteCleanupFailed]);
}

#[test]
fn test_first_error_is_reported_and_run_continues() {
    let mut engine = engine();
    let broken = engine
        .add_suite("broken", SuiteHooks::new().init(|| 3))
        .unwrap()
        .id();
    engine.add_test(broken, "t", |_| Ok(())).unwrap();
    let later = engine
        .add_suite("later", SuiteHooks::new().cleanup(|| 1))
        .unwrap()
        .id();
    engine.add_test(later, "t", |_| Ok(())).unwrap();

    let err = engine.run_all().unwrap_err();

    assert_eq!(err, EngineError::SuiteInitFailed);
    assert_eq!(engine.last_error(), ErrorCode::SuiteInitFailed);
    assert_eq!(
        kinds(&engine),
        vec![FailureKind::SuiteInitFailed, FailureKind::SuiteCleanupFailed]
    );
    assert_eq!(engine.run_summary().tests_run, 1);
}

#[test]
fn test_error_action_fail_stops_at_first_error() {
    let mut engine = engine();
    engine.set_error_action(ErrorAction::Fail);
    let broken = engine
        .add_suite("broken", SuiteHooks::new().init(|| 1))
        .unwrap()
        .id();
    engine.add_test(broken, "t", |_| Ok(())).unwrap();
    let later = engine.add_suite("later", SuiteHooks::new()).unwrap().id();
    engine.add_test(later, "t", |_| Ok(())).unwrap();

    assert_eq!(engine.run_all().unwrap_err(), EngineError::SuiteInitFailed);
    assert_eq!(engine.run_summary().suites_run, 0);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_handlers_fire_in_lifecycle_order() {
    let log = new_log();
    let mut engine = engine();
    {
        let handlers = engine.handlers_mut();
        let l = log.clone();
        handlers.set_suite_start(move |s| l.lock().push(format!("suite_start {}", s.name())));
        let l = log.clone();
        handlers.set_test_start(move |t, _| l.lock().push(format!("test_start {}", t.name())));
        let l = log.clone();
        handlers.set_test_complete(move |t, _, failures| {
            l.lock()
                .push(format!("test_complete {} {}", t.name(), failures.len()));
        });
        let l = log.clone();
        handlers.set_suite_complete(move |s, failures| {
            l.lock()
                .push(format!("suite_complete {} {}", s.name(), failures.len()));
        });
        let l = log.clone();
        handlers.set_all_complete(move |failures| l.lock().push(format!("all_complete {}", failures.len())));
    }
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(suite, "fails", |t| {
            unit_fail!(t, "first");
            unit_fail!(t, "second");
            Ok(())
        })
        .unwrap();
    engine.add_test(suite, "passes", |_| Ok(())).unwrap();

    engine.run_all().unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "suite_start s",
            "test_start fails",
            "test_complete fails 2",
            "test_start passes",
            "test_complete passes 0",
            "suite_complete s 2",
            "all_complete 2",
        ]
    );
}

#[test]
fn test_init_and_cleanup_failure_handlers() {
    let log = new_log();
    let mut engine = engine();
    let l = log.clone();
    engine
        .handlers_mut()
        .set_suite_init_failure(move |s| l.lock().push(format!("init {}", s.name())));
    let l = log.clone();
    engine
        .handlers_mut()
        .set_suite_cleanup_failure(move |s| l.lock().push(format!("cleanup {}", s.name())));
    engine
        .add_suite("a", SuiteHooks::new().init(|| 1))
        .unwrap();
    engine
        .add_suite("b", SuiteHooks::new().cleanup(|| 1))
        .unwrap();

    let _ = engine.run_all();

    assert_eq!(entries(&log), vec!["init a", "cleanup b"]);
}

#[test]
fn test_suite_complete_sees_only_its_own_failures() {
    let seen = new_log();
    let mut engine = engine();
    let l = seen.clone();
    engine.handlers_mut().set_suite_complete(move |s, failures| {
        let tests: Vec<_> = failures.iter().filter_map(|f| f.test_name.clone()).collect();
        l.lock().push(format!("{}: {}", s.name(), tests.join(",")));
    });
    let a = engine.add_suite("a", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(a, "a1", |t| {
            unit_fail!(t, "boom");
            Ok(())
        })
        .unwrap();
    let b = engine.add_suite("b", SuiteHooks::new()).unwrap().id();
    engine.add_test(b, "b1", |_| Ok(())).unwrap();
    let c = engine.add_suite("c", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(c, "c1", |t| {
            unit_fail!(t, "boom", fatal);
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    assert_eq!(entries(&seen), vec!["a: a1", "b: ", "c: c1"]);
}

#[test]
fn test_suite_tallies_count_failed_and_passed_tests() {
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(suite, "bad", |t| {
            unit_assert!(t, false);
            Ok(())
        })
        .unwrap();
    engine.add_test(suite, "good", |_| Ok(())).unwrap();
    engine.add_test(suite, "good too", |_| Ok(())).unwrap();

    engine.run_all().unwrap();

    let registry = engine.registry().unwrap();
    assert_eq!(registry[suite].tests_failed(), 1);
    assert_eq!(registry[suite].tests_succeeded(), 2);
}

#[test]
fn test_run_suite_runs_only_that_suite() {
    let mut engine = engine();
    let a = engine.add_suite("a", SuiteHooks::new()).unwrap().id();
    engine.add_test(a, "t", |_| Ok(())).unwrap();
    let b = engine.add_suite("b", SuiteHooks::new()).unwrap().id();
    engine.add_test(b, "t1", |_| Ok(())).unwrap();
    engine.add_test(b, "t2", |_| Ok(())).unwrap();

    engine.run_suite(b).unwrap();

    assert_eq!(engine.run_summary().suites_run, 1);
    assert_eq!(engine.run_summary().tests_run, 2);
}

#[test]
fn test_run_test_runs_single_test_with_suite_hooks() {
    let log = new_log();
    let mut engine = engine();
    let (init_log, cleanup_log) = (log.clone(), log.clone());
    let suite = engine
        .add_suite(
            "s",
            SuiteHooks::new()
                .init(move || {
                    init_log.lock().push("init".into());
                    0
                })
                .cleanup(move || {
                    cleanup_log.lock().push("cleanup".into());
                    0
                }),
        )
        .unwrap()
        .id();
    let l = log.clone();
    engine
        .add_test(suite, "skipped", move |_| {
            l.lock().push("skipped".into());
            Ok(())
        })
        .unwrap();
    let l = log.clone();
    let chosen = engine
        .add_test(suite, "chosen", move |_| {
            l.lock().push("chosen".into());
            Ok(())
        })
        .unwrap()
        .id();

    engine.run_test(suite, chosen).unwrap();

    assert_eq!(entries(&log), vec!["init", "chosen", "cleanup"]);
    assert_eq!(engine.run_summary().tests_run, 1);
}

#[test]
fn test_run_test_validates_arguments() {
    let mut engine = engine();
    let a = engine.add_suite("a", SuiteHooks::new()).unwrap().id();
    let b = engine.add_suite("b", SuiteHooks::new()).unwrap().id();
    let in_b = engine.add_test(b, "t", |_| Ok(())).unwrap().id();

    let mut other = Engine::new(EngineConfig::default()).unwrap();
    other.initialize_registry().unwrap();
    let foreign = other.add_suite("x", SuiteHooks::new()).unwrap().id();
    let foreign_test = other.add_test(foreign, "x", |_| Ok(())).unwrap().id();

    assert_eq!(engine.run_test(foreign, in_b), Err(EngineError::NoSuite));
    assert_eq!(engine.run_test(a, foreign_test), Err(EngineError::NoTest));
    assert_eq!(engine.run_test(a, in_b), Err(EngineError::TestNotInSuite));
    assert_eq!(engine.last_error(), ErrorCode::TestNotInSuite);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_run_test_in_inactive_suite() {
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let test = engine.add_test(suite, "t", |_| Ok(())).unwrap().id();
    engine.set_suite_active(suite, false).unwrap();

    assert_eq!(engine.run_test(suite, test), Err(EngineError::SuiteInactive));
    assert_eq!(kinds(&engine), vec![FailureKind::SuiteInactive]);
    assert_eq!(engine.run_summary().suites_inactive, 1);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_run_test_on_inactive_test() {
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let test = engine.add_test(suite, "t", |_| Ok(())).unwrap().id();
    engine.set_test_active(test, false).unwrap();

    assert_eq!(engine.run_test(suite, test), Err(EngineError::TestInactive));
    assert_eq!(engine.run_summary().tests_inactive, 1);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_run_test_in_inactive_suite_reports_without_record() {
    let mut engine = engine();
    engine.set_fail_on_inactive(false);
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let test = engine.add_test(suite, "t", |_| Ok(())).unwrap().id();
    engine.set_suite_active(suite, false).unwrap();

    assert_eq!(engine.run_test(suite, test), Err(EngineError::SuiteInactive));
    assert_eq!(engine.last_error(), ErrorCode::SuiteInactive);
    assert!(engine.failure_list().is_empty());
    assert_eq!(engine.run_summary().suites_inactive, 1);
    assert_eq!(engine.run_summary().tests_run, 0);
}

#[test]
fn test_run_test_on_inactive_test_reports_without_record() {
    let mut engine = engine();
    engine.set_fail_on_inactive(false);
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    let test = engine.add_test(suite, "t", |_| Ok(())).unwrap().id();
    engine.set_test_active(test, false).unwrap();

    assert_eq!(engine.run_test(suite, test), Err(EngineError::TestInactive));
    assert_eq!(engine.last_error(), ErrorCode::TestInactive);
    assert!(engine.failure_list().is_empty());
    assert_eq!(engine.run_summary().tests_inactive, 1);

    // Walking the whole suite skips it quietly under the same policy.
    engine.run_all().unwrap();
    assert_eq!(engine.last_error(), ErrorCode::Success);
    assert_eq!(engine.run_summary().tests_inactive, 1);
    assert!(engine.failure_list().is_empty());
}

#[test]
fn test_runs_without_registry_fail() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    assert_eq!(engine.run_all(), Err(EngineError::NoRegistry));
    assert_eq!(engine.last_error(), ErrorCode::NoRegistry);
}

#[test]
fn test_failure_pool_exhaustion_drops_records() {
    let limits = Limits {
        max_failures: 2,
        ..Limits::default()
    };
    let mut engine = Engine::new(EngineConfig::with_limits(limits)).unwrap();
    engine.initialize_registry().unwrap();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(suite, "fills pool", |t| {
            unit_fail!(t, "one");
            unit_fail!(t, "two");
            Ok(())
        })
        .unwrap();
    engine
        .add_test(suite, "overflows", |t| {
            unit_fail!(t, "three");
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    let summary = engine.run_summary();
    assert_eq!(summary.failure_records, 2);
    assert_eq!(summary.failures_dropped, 1);
    assert_eq!(summary.asserts_failed, 3);
    assert_eq!(summary.tests_failed, 2);
    assert_eq!(engine.failure_list().len(), 2);
}

#[test]
fn test_failure_pool_is_reclaimed_between_runs() {
    let limits = Limits {
        max_failures: 1,
        ..Limits::default()
    };
    let mut engine = Engine::new(EngineConfig::with_limits(limits)).unwrap();
    engine.initialize_registry().unwrap();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(suite, "fails", |t| {
            unit_fail!(t, "boom");
            Ok(())
        })
        .unwrap();

    for _ in 0..3 {
        engine.run_all().unwrap();
        assert_eq!(engine.run_summary().failure_records, 1);
        assert_eq!(engine.run_summary().failures_dropped, 0);
    }
}

#[test]
fn test_previous_results_are_cleared() {
    let mut engine = engine();
    let suite = engine.add_suite("s", SuiteHooks::new()).unwrap().id();
    engine
        .add_test(suite, "fails", |t| {
            unit_assert!(t, false);
            Ok(())
        })
        .unwrap();
    engine.run_all().unwrap();
    assert_eq!(engine.failure_list().len(), 1);

    engine.clear_previous_results();

    assert_eq!(engine.run_summary(), &RunSummary::new());
    assert!(engine.failure_list().is_empty());
}

#[test]
fn test_context_reports_current_suite_and_test() {
    let seen = new_log();
    let mut engine = engine();
    let suite = engine.add_suite("outer", SuiteHooks::new()).unwrap().id();
    let l = seen.clone();
    engine
        .add_test(suite, "inner", move |t| {
            unit_assert!(t, true);
            l.lock().push(format!(
                "{}/{} asserts={}",
                t.current_suite().name(),
                t.current_test().name(),
                t.summary().asserts
            ));
            Ok(())
        })
        .unwrap();

    engine.run_all().unwrap();

    assert_eq!(entries(&seen), vec!["outer/inner asserts=1"]);
    assert!(!engine.is_test_running());
    assert_eq!(engine.current_suite(), None);
    assert_eq!(engine.current_test(), None);
}

#[test]
fn test_panicking_handler_leaves_engine_idle() {
    let mut engine = engine();
    engine
        .handlers_mut()
        .set_suite_start(|_| panic!("handler failure"));
    engine.add_suite("s", SuiteHooks::new()).unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| engine.run_all()));

    assert!(outcome.is_err());
    assert!(!engine.is_test_running());
    assert_eq!(engine.current_suite(), None);

    engine.handlers_mut().clear_suite_start();
    engine.run_all().unwrap();
    assert_eq!(engine.run_summary().suites_run, 1);
}
