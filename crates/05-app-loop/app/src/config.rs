use services_stepper::StepperConfig;
use world::{CheckpointConfig, EngineMode, PerformanceCaps, PopulationConfig, RunMode};

/// Everything a [`crate::GameRuntime`] needs at construction.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub engine_mode: EngineMode,
    pub run_mode: RunMode,
    /// Initial skip exponent; `None` uses the run mode's default.
    pub skip_exponent: Option<u32>,
    pub checkpoints: CheckpointConfig,
    pub population: PopulationConfig,
    pub caps: PerformanceCaps,
    pub stepper: StepperConfig,
    /// Exact state hashes are only recorded at or below this population.
    pub hash_cell_ceiling: usize,
    /// How far back the exact-state history looks for a repeat.
    pub hash_lookback: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine_mode: EngineMode::Normal,
            run_mode: RunMode::Cruise,
            skip_exponent: None,
            checkpoints: CheckpointConfig::default(),
            population: PopulationConfig::default(),
            caps: PerformanceCaps::default(),
            stepper: StepperConfig::default(),
            hash_cell_ceiling: 2048,
            hash_lookback: 64,
        }
    }
}
