use std::thread;
use std::time::{Duration, Instant};

use app::{GameRuntime, RuntimeConfig};
use service_abi::Cell;
use services_stepper::{OffloadStrategy, StepperConfig};

pub const GLIDER: [(i32, i32); 5] = [(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)];

pub fn cells(raw: &[(i32, i32)]) -> Vec<Cell> {
    raw.iter().copied().map(Cell::from).collect()
}

pub fn sorted(mut cells: Vec<Cell>) -> Vec<Cell> {
    cells.sort();
    cells
}

pub fn stepper(strategy: OffloadStrategy) -> StepperConfig {
    StepperConfig {
        strategy,
        ..StepperConfig::default()
    }
}

pub fn runtime(config: RuntimeConfig) -> GameRuntime {
    let _ = env_logger::builder().is_test(true).try_init();
    GameRuntime::builder()
        .config(config)
        .build()
        .expect("runtime builds")
}

/// Calls `tick` every millisecond until `done` holds or `timeout` passes.
pub fn drive_until(
    runtime: &mut GameRuntime,
    timeout: Duration,
    mut done: impl FnMut(&GameRuntime) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        runtime.tick();
        if done(runtime) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}
