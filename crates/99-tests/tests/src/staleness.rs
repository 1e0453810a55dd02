//! A result for a superseded request never reaches the grid.

use std::thread;
use std::time::{Duration, Instant};

use app::RuntimeConfig;
use pretty_assertions::assert_eq;
use service_abi::Cell;
use services_stepper::OffloadStrategy;

use crate::support::{cells, runtime, sorted, stepper, GLIDER};

fn drain_one(runtime: &mut app::GameRuntime) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while runtime.poll_results() == 0 {
        assert!(Instant::now() < deadline, "worker never answered");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn manual_edit_wins_over_in_flight_batch() {
    for strategy in [OffloadStrategy::Thread, OffloadStrategy::Inline] {
        let mut runtime = runtime(RuntimeConfig {
            stepper: stepper(strategy),
            ..RuntimeConfig::default()
        });
        runtime.load_cells(cells(&GLIDER), 0);
        let before = runtime.request_counter();

        assert!(runtime.step());
        runtime.set_cell_alive(20, 20, true);
        assert!(runtime.request_counter() > before);
        drain_one(&mut runtime);

        let mut expected = cells(&GLIDER);
        expected.push(Cell::new(20, 20));
        assert_eq!(runtime.generation(), 0, "{strategy:?}");
        assert_eq!(sorted(runtime.live_cells()), sorted(expected));
    }
}

#[test]
fn clear_discards_in_flight_batch() {
    let mut runtime = runtime(RuntimeConfig {
        stepper: stepper(OffloadStrategy::Thread),
        ..RuntimeConfig::default()
    });
    runtime.load_cells(cells(&GLIDER), 3);
    runtime.start();
    runtime.tick();
    runtime.clear();
    // The batch may already have landed during the tick.
    let deadline = Instant::now() + Duration::from_millis(200);
    while Instant::now() < deadline {
        runtime.poll_results();
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(runtime.generation(), 0);
    assert_eq!(runtime.population(), 0);
    assert!(!runtime.is_running());
}
