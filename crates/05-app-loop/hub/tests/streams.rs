use std::thread;
use std::time::Duration;

use hub::RuntimeStreams;
use pretty_assertions::assert_eq;
use world::{EngineMode, RunMode, Telemetry};

#[test]
fn fresh_streams_expose_initial_state() {
    let streams = RuntimeStreams::default();
    assert_eq!(*streams.generation.get(), 0);
    assert_eq!(*streams.engine_mode.get(), EngineMode::Normal);
    assert_eq!(*streams.run_mode.get(), RunMode::Cruise);
    assert_eq!(*streams.skip_exponent.get(), 7);
    assert_eq!(*streams.telemetry.get(), Telemetry::default());
    assert!(streams.live_cells.get().is_empty());
    assert!(streams.stability.get().is_none());
}

#[test]
fn updates_cross_threads_in_order() {
    let streams = RuntimeStreams::default();
    let sub = streams.generation.subscribe();

    let publisher = {
        let generation = streams.generation.clone();
        thread::spawn(move || {
            for value in 1..=50u64 {
                generation.publish(value);
            }
        })
    };
    publisher.join().expect("publisher thread");

    let mut seen = Vec::new();
    while let Some(value) = sub.recv_timeout(Duration::from_millis(50)) {
        seen.push(*value);
    }
    assert_eq!(seen, (0..=50).collect::<Vec<_>>());
}
