//! Simulation policy state owned by the runtime.
//!
//! The `world` crate holds the pieces of runtime state that are not the grid
//! itself: run-mode pacing, the checkpoint ring, population history and the
//! steady-state detectors, plus the small value types observers see.

/// Checkpoint ring with capture throttling.
pub mod checkpoint;
/// Population history and flat-population heuristic.
pub mod population;
/// Run-mode selection and pacing.
pub mod run_mode;
/// Exact-state hashing and period detection.
pub mod stability;
/// Mode, telemetry and cap types.
pub mod types;

pub use crate::checkpoint::{CaptureSkip, Checkpoint, CheckpointConfig, CheckpointStore};
pub use crate::population::{
    compute_population_change, PopulationChange, PopulationConfig, PopulationTracker,
};
pub use crate::run_mode::{RunModeController, NORMAL_RENDER_INTERVAL_MS};
pub use crate::stability::{
    build_cell_state_hash, detect_state_period, find_steady_state, StabilityEvent,
    StabilityPattern, StateHistory, SteadyState,
};
pub use crate::types::{EngineMode, PerformanceCaps, RunMode, RunModeConfig, Telemetry, UnknownMode};
