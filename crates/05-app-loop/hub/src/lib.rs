//! Observable runtime state.
//!
//! Each facet of runtime state is an independent [`Topic`]. The runtime is
//! the only publisher; any number of observers may subscribe, each starting
//! from the current value.

mod topic;

use std::sync::Arc;

use service_abi::Cell;
use world::{Checkpoint, EngineMode, PerformanceCaps, RunMode, StabilityEvent, Telemetry};

pub use topic::{Subscription, Topic};

/// The full set of state streams published by the runtime.
#[derive(Clone)]
pub struct RuntimeStreams {
    pub live_cells: Topic<Arc<[Cell]>>,
    pub generation: Topic<u64>,
    pub engine_mode: Topic<EngineMode>,
    pub run_mode: Topic<RunMode>,
    pub skip_exponent: Topic<u32>,
    pub telemetry: Topic<Telemetry>,
    /// Newest first.
    pub checkpoints: Topic<Vec<Checkpoint>>,
    pub running: Topic<bool>,
    /// Set when the runtime halts on a steady state; cleared on dismissal.
    pub stability: Topic<Option<StabilityEvent>>,
    pub population_history: Topic<Vec<usize>>,
    pub performance_caps: Topic<PerformanceCaps>,
}

impl RuntimeStreams {
    /// Streams holding the initial state of a fresh runtime.
    pub fn new(engine_mode: EngineMode, run_mode: RunMode, skip_exponent: u32) -> Self {
        Self {
            live_cells: Topic::new("live_cells", Arc::from(Vec::new())),
            generation: Topic::new("generation", 0),
            engine_mode: Topic::new("engine_mode", engine_mode),
            run_mode: Topic::new("run_mode", run_mode),
            skip_exponent: Topic::new("skip_exponent", skip_exponent),
            telemetry: Topic::new("telemetry", Telemetry::default()),
            checkpoints: Topic::new("checkpoints", Vec::new()),
            running: Topic::new("running", false),
            stability: Topic::new("stability", None),
            population_history: Topic::new("population_history", Vec::new()),
            performance_caps: Topic::new("performance_caps", PerformanceCaps::default()),
        }
    }
}

impl Default for RuntimeStreams {
    fn default() -> Self {
        let run_mode = RunMode::default();
        Self::new(
            EngineMode::default(),
            run_mode,
            run_mode.config().default_exponent,
        )
    }
}
