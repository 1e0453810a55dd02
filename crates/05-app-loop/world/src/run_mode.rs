//! Run-mode selection and the batch/render pacing derived from it.

use service_abi::MAX_BATCH_GENERATIONS;

use crate::types::{EngineMode, RunMode, RunModeConfig};

/// Render interval used outside hashlife, `floor(1000 / 60)`.
pub const NORMAL_RENDER_INTERVAL_MS: u64 = 1000 / 60;

/// Highest skip exponent accepted from callers before run-mode clamping.
pub const MAX_SKIP_EXPONENT: u32 = 15;

/// Active run mode plus skip exponent.
///
/// The exponent always lies inside the active mode's bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunModeController {
    run_mode: RunMode,
    skip_exponent: u32,
}

impl Default for RunModeController {
    fn default() -> Self {
        let run_mode = RunMode::default();
        Self {
            run_mode,
            skip_exponent: run_mode.config().default_exponent,
        }
    }
}

impl RunModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn config(&self) -> RunModeConfig {
        self.run_mode.config()
    }

    pub fn skip_exponent(&self) -> u32 {
        self.skip_exponent
    }

    /// Switches preset, keeping the exponent unless it falls outside the new bounds.
    pub fn set_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
        self.skip_exponent = mode.config().clamp_exponent(i64::from(self.skip_exponent));
    }

    /// Sets the exponent, clamped to `[0, 15]` and then to the mode's bounds.
    pub fn set_skip_exponent(&mut self, exponent: i64) -> u32 {
        let requested = exponent.clamp(0, i64::from(MAX_SKIP_EXPONENT));
        self.skip_exponent = self.config().clamp_exponent(requested);
        self.skip_exponent
    }

    /// Applies a batch size as `floor(log2(size))`.
    pub fn set_batch_size(&mut self, size: u32) -> u32 {
        let exponent = size.max(1).ilog2();
        self.set_skip_exponent(i64::from(exponent))
    }

    /// Generations per batch: `2^exponent` in hashlife, otherwise one.
    pub fn batch_size(&self, engine: EngineMode) -> u32 {
        match engine {
            EngineMode::Normal => 1,
            EngineMode::Hashlife => 1u32
                .checked_shl(self.skip_exponent)
                .unwrap_or(MAX_BATCH_GENERATIONS)
                .clamp(1, MAX_BATCH_GENERATIONS),
        }
    }

    /// Upper bound the adaptive scheduler may grow a batch to.
    pub fn max_batch_size(&self, engine: EngineMode) -> u32 {
        let base = self.batch_size(engine);
        match engine {
            EngineMode::Hashlife => base.max(MAX_BATCH_GENERATIONS.min(base.saturating_mul(4))),
            EngineMode::Normal => 16u32.max(base.saturating_mul(2)),
        }
    }

    pub fn render_interval_ms(&self, engine: EngineMode) -> u64 {
        match engine {
            EngineMode::Normal => NORMAL_RENDER_INTERVAL_MS,
            EngineMode::Hashlife => (1000 / u64::from(self.config().render_fps.max(1))).max(1),
        }
    }
}
