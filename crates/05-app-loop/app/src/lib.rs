//! Adaptive simulation loop and the runtime that owns it.
//!
//! [`GameRuntime`] is the single owner of simulation state. A host drives it
//! by calling [`GameRuntime::on_frame`] once per display refresh; the
//! embedded [`LoopScheduler`] decides whether to dispatch a batch and how
//! large, and finished batches are applied on later frames.

pub mod clock;
mod config;
mod error;
mod executor;
mod runtime;
pub mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use executor::StepExecutor;
pub use runtime::{ErrorHook, GameRuntime, GameRuntimeBuilder};
pub use scheduler::{BatchOutcome, FrameAction, LoopPacing, LoopScheduler, SkipReason};
