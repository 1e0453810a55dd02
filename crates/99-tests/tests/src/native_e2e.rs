//! The runtime driven on wall-clock time with a real worker thread.

use std::time::Duration;

use app::RuntimeConfig;
use pretty_assertions::assert_eq;
use services_stepper::OffloadStrategy;
use world::EngineMode;

use crate::support::{cells, drive_until, runtime, stepper, GLIDER};

#[test]
fn worker_thread_drives_the_loop() {
    let mut runtime = runtime(RuntimeConfig {
        stepper: stepper(OffloadStrategy::Thread),
        ..RuntimeConfig::default()
    });
    runtime.load_cells(cells(&GLIDER), 0);
    let generations = runtime.streams().generation.subscribe();
    runtime.start();

    assert!(drive_until(&mut runtime, Duration::from_secs(10), |rt| {
        rt.generation() >= 32
    }));
    runtime.pause();

    assert_eq!(runtime.population(), 5);
    assert!(runtime.telemetry().worker_used);
    let seen: Vec<u64> = generations.drain().into_iter().map(|g| *g).collect();
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "{seen:?}");
    assert_eq!(seen.last().copied(), Some(runtime.generation()));
}

#[test]
fn hashlife_run_captures_restorable_checkpoints() {
    let mut runtime = runtime(RuntimeConfig {
        engine_mode: EngineMode::Hashlife,
        skip_exponent: Some(6),
        stepper: stepper(OffloadStrategy::Thread),
        ..RuntimeConfig::default()
    });
    runtime.load_cells(cells(&GLIDER), 0);
    let first = runtime.checkpoints()[0].id;
    runtime.start();

    assert!(drive_until(&mut runtime, Duration::from_secs(10), |rt| {
        rt.generation() >= 1024
    }));
    runtime.pause();

    assert!(runtime.restore_checkpoint(first));
    assert_eq!(runtime.generation(), 0);
    assert_eq!(runtime.population(), 5);
    assert!(!runtime.is_running());
}

#[test]
fn shutdown_then_drop_is_clean() {
    let mut runtime = runtime(RuntimeConfig::default());
    runtime.load_cells(cells(&GLIDER), 0);
    assert!(runtime.step());
    runtime.shutdown();
    assert!(!runtime.has_pending_step());
    assert!(!runtime.step());
}
