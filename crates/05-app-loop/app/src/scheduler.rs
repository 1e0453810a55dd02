//! Frame-paced adaptive batch scheduler.
//!
//! The host calls [`LoopScheduler::on_frame`] once per display refresh. The
//! scheduler gates on render rate, the in-flight batch and the generation
//! rate cap, then sizes the next batch from the base size and an adaptive
//! scale tuned by measured batch latency.

use log::trace;
use service_abi::MAX_BATCH_GENERATIONS;

/// Lower bound of the adaptive scale.
pub const MIN_SCALE: f64 = 1.0;
/// Upper bound of the adaptive scale.
pub const MAX_SCALE: f64 = 8.0;
/// Batches at or above this latency shrink the scale.
pub const SLOW_BATCH_MS: f64 = 18.0;
/// Batches at or below this latency grow the scale.
pub const FAST_BATCH_MS: f64 = 6.0;

const BACK_OFF: f64 = 0.7;
const SPEED_UP: f64 = 1.18;
const ON_ERROR: f64 = 0.5;

/// Pacing inputs re-read on every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopPacing {
    pub base_batch: u32,
    pub max_batch: u32,
    /// Minimum time between dispatching frames; zero disables the gate.
    pub render_interval_ms: f64,
    /// Minimum time per generation; zero disables the gate.
    pub generation_interval_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Stopped,
    RenderGate,
    InFlight,
    GenerationGate,
}

/// Decision for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAction {
    Skip(SkipReason),
    /// Run a batch of this many generations, then report via [`LoopScheduler::complete`].
    Dispatch { batch: u32 },
}

/// How a dispatched batch ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatchOutcome {
    /// Result applied; `elapsed_ms` feeds the scale tuning.
    Applied { elapsed_ms: f64 },
    /// The batch failed; the scale is halved.
    Failed,
    /// The result was dropped without being measured.
    Discarded,
}

/// Stopped/running loop state with at most one batch in flight.
#[derive(Clone, Debug)]
pub struct LoopScheduler {
    running: bool,
    in_flight: bool,
    frame_pending: bool,
    next_allowed_step_at: f64,
    last_render_frame_at: Option<f64>,
    adaptive_scale: f64,
    epoch: u64,
}

impl Default for LoopScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopScheduler {
    pub fn new() -> Self {
        Self {
            running: false,
            in_flight: false,
            frame_pending: false,
            next_allowed_step_at: 0.0,
            last_render_frame_at: None,
            adaptive_scale: MIN_SCALE,
            epoch: 0,
        }
    }

    /// Begins a fresh cycle, resetting gates and the adaptive scale.
    ///
    /// Starting an already running loop restarts it.
    pub fn start(&mut self) {
        self.stop();
        self.running = true;
        self.next_allowed_step_at = 0.0;
        self.last_render_frame_at = None;
        self.adaptive_scale = MIN_SCALE;
        self.epoch = self.epoch.wrapping_add(1);
        self.frame_pending = true;
        trace!("loop.start epoch={}", self.epoch);
    }

    /// Stops scheduling immediately. A batch still in flight is forgotten.
    pub fn stop(&mut self) {
        self.running = false;
        self.in_flight = false;
        self.frame_pending = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// True while the loop wants another frame callback.
    pub fn wants_frame(&self) -> bool {
        self.frame_pending
    }

    pub fn adaptive_scale(&self) -> f64 {
        self.adaptive_scale
    }

    /// Identifies the current cycle; bumped by every [`LoopScheduler::start`].
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Runs the per-frame gates and sizes the next batch.
    ///
    /// `timestamp` is the frame callback time, `now` the clock reading.
    pub fn on_frame(&mut self, timestamp: f64, now: f64, pacing: &LoopPacing) -> FrameAction {
        if !self.running {
            self.frame_pending = false;
            return FrameAction::Skip(SkipReason::Stopped);
        }
        self.frame_pending = true;

        let render_interval = pacing.render_interval_ms.max(0.0);
        if render_interval > 0.0 {
            if let Some(last) = self.last_render_frame_at {
                if timestamp - last < render_interval {
                    return FrameAction::Skip(SkipReason::RenderGate);
                }
            }
        }

        if self.in_flight {
            return FrameAction::Skip(SkipReason::InFlight);
        }

        if now < self.next_allowed_step_at {
            return FrameAction::Skip(SkipReason::GenerationGate);
        }

        let batch = self.desired_batch(pacing);
        self.in_flight = true;
        self.last_render_frame_at = Some(timestamp);
        let generation_interval = pacing.generation_interval_ms.max(0.0);
        if generation_interval > 0.0 {
            self.next_allowed_step_at = now + f64::from(batch) * generation_interval;
        }
        trace!(
            "loop.dispatch batch={batch} scale={:.3} epoch={}",
            self.adaptive_scale,
            self.epoch
        );
        FrameAction::Dispatch { batch }
    }

    /// Batch the next dispatch would use: `clamp(round(base * scale), 1, max)`.
    pub fn desired_batch(&self, pacing: &LoopPacing) -> u32 {
        let base = pacing.base_batch.clamp(1, MAX_BATCH_GENERATIONS);
        let max = pacing.max_batch.clamp(base, MAX_BATCH_GENERATIONS);
        let scaled = (f64::from(base) * self.adaptive_scale).round();
        (scaled as u32).clamp(1, max)
    }

    /// Finishes the in-flight batch and tunes the scale.
    ///
    /// Ignored when the loop is stopped.
    pub fn complete(&mut self, outcome: BatchOutcome) {
        if !self.running {
            return;
        }
        match outcome {
            BatchOutcome::Applied { elapsed_ms } => self.tune(elapsed_ms),
            BatchOutcome::Failed => {
                self.adaptive_scale = (self.adaptive_scale * ON_ERROR).max(MIN_SCALE);
            }
            BatchOutcome::Discarded => {}
        }
        self.in_flight = false;
        self.frame_pending = true;
    }

    fn tune(&mut self, elapsed_ms: f64) {
        if !elapsed_ms.is_finite() {
            return;
        }
        if elapsed_ms >= SLOW_BATCH_MS {
            self.adaptive_scale = (self.adaptive_scale * BACK_OFF).max(MIN_SCALE);
        } else if elapsed_ms <= FAST_BATCH_MS {
            self.adaptive_scale = (self.adaptive_scale * SPEED_UP).min(MAX_SCALE);
        }
    }
}
