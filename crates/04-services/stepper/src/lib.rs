//! Batch stepping service.
//!
//! [`StepService`] accepts [`StepCmd`] requests and reports [`StepRep`]s
//! through the [`Service`] submit/drain contract. Work goes to a background
//! worker thread when one can be spawned; otherwise, and permanently after
//! the worker fails, it runs on the caller's thread in cooperative chunks.

mod backend;
mod inline;
mod kernel;
mod thread;

use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use service_abi::{RequestId, Service, StepCmd, StepFailure, StepRep, SubmitOutcome};
use smallvec::SmallVec;

pub use backend::{BackendHealth, StepBackend};
pub use inline::{InlineBackend, DEFAULT_INLINE_CHUNK, DEFAULT_INLINE_SLICE};
pub use kernel::{life_kernel, StepKernel};
pub use thread::{LifeWorkerEngine, ThreadBackend};

/// Where batches are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OffloadStrategy {
    /// Spawn a background worker thread on first use.
    #[default]
    Thread,
    /// Never spawn a worker; always step on the caller's thread.
    Inline,
}

/// Stepper construction options.
#[derive(Clone, Debug)]
pub struct StepperConfig {
    pub strategy: OffloadStrategy,
    /// Generations computed per inline chunk.
    pub inline_chunk: u32,
    /// Time one drain may spend on inline work.
    pub inline_slice: Duration,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            strategy: OffloadStrategy::Thread,
            inline_chunk: DEFAULT_INLINE_CHUNK,
            inline_slice: DEFAULT_INLINE_SLICE,
        }
    }
}

/// Produces a fresh worker backend on demand.
pub type WorkerSpawner = Box<dyn FnMut() -> io::Result<Box<dyn StepBackend>> + Send>;

/// Request/report stepping service with automatic inline fallback.
pub struct StepService {
    spawner: Option<WorkerSpawner>,
    worker: Option<Box<dyn StepBackend>>,
    worker_failed: bool,
    inline: InlineBackend,
    terminated: SmallVec<[RequestId; 8]>,
}

impl StepService {
    pub fn new(config: StepperConfig) -> Self {
        let spawner: Option<WorkerSpawner> = match config.strategy {
            OffloadStrategy::Thread => Some(Box::new(|| {
                ThreadBackend::spawn().map(|backend| Box::new(backend) as Box<dyn StepBackend>)
            })),
            OffloadStrategy::Inline => None,
        };
        Self::build(spawner, &config)
    }

    /// Uses `spawner` to create the worker backend instead of the default thread.
    pub fn with_worker_spawner(config: StepperConfig, spawner: WorkerSpawner) -> Self {
        Self::build(Some(spawner), &config)
    }

    fn build(spawner: Option<WorkerSpawner>, config: &StepperConfig) -> Self {
        Self {
            spawner,
            worker: None,
            worker_failed: false,
            inline: InlineBackend::new(config.inline_chunk, config.inline_slice),
            terminated: SmallVec::new(),
        }
    }

    /// True once the worker failed and every later request runs inline.
    pub fn worker_failed(&self) -> bool {
        self.worker_failed
    }

    /// True while a worker backend exists.
    pub fn worker_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Requests submitted but not yet reported.
    pub fn pending(&self) -> usize {
        self.worker.as_ref().map_or(0, |w| w.pending()) + self.inline.pending()
            + self.terminated.len()
    }

    /// Stops the worker and fails every outstanding request with
    /// [`StepFailure::Terminated`]. Safe to call repeatedly; a later
    /// submit spawns a fresh worker unless the worker has failed before.
    pub fn shutdown(&mut self) {
        let mut abandoned = Vec::new();
        if let Some(mut worker) = self.worker.take() {
            abandoned.extend(worker.shutdown());
            debug!("stepper.shutdown backend={}", worker.name());
        }
        abandoned.extend(self.inline.shutdown());
        if !abandoned.is_empty() {
            debug!("stepper.shutdown abandoned={}", abandoned.len());
        }
        self.terminated.extend(abandoned);
    }

    fn ensure_worker(&mut self) -> Option<&mut Box<dyn StepBackend>> {
        if self.worker.is_none() && !self.worker_failed {
            if let Some(spawner) = self.spawner.as_mut() {
                match spawner() {
                    Ok(backend) => {
                        info!("stepper.worker_started backend={}", backend.name());
                        self.worker = Some(backend);
                    }
                    Err(err) => {
                        warn!("stepper.worker_unavailable error={err}");
                        self.worker_failed = true;
                    }
                }
            }
        }
        self.worker.as_mut()
    }

    fn mark_worker_failed(&mut self) {
        if !self.worker_failed {
            warn!("stepper.fallback_inline");
        }
        self.worker_failed = true;
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
    }

    fn submit_inline(&mut self, cmd: StepCmd) -> SubmitOutcome {
        match self.inline.submit(cmd) {
            Ok(()) => SubmitOutcome::Accepted,
            Err((outcome, _)) => outcome,
        }
    }
}

impl Default for StepService {
    fn default() -> Self {
        Self::new(StepperConfig::default())
    }
}

impl Drop for StepService {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

impl Service for StepService {
    type Cmd = StepCmd;
    type Rep = StepRep;

    fn try_submit(&mut self, cmd: StepCmd) -> SubmitOutcome {
        let Some(worker) = self.ensure_worker() else {
            return self.submit_inline(cmd);
        };
        match worker.submit(cmd) {
            Ok(()) => SubmitOutcome::Accepted,
            Err((SubmitOutcome::WouldBlock, _)) => SubmitOutcome::WouldBlock,
            Err((_, cmd)) => {
                self.mark_worker_failed();
                self.submit_inline(cmd)
            }
        }
    }

    fn drain(&mut self, max: usize) -> SmallVec<[StepRep; 8]> {
        let budget = if max == 0 { usize::MAX } else { max };
        let mut out: SmallVec<[StepRep; 8]> = SmallVec::new();

        while out.len() < budget {
            let Some(request_id) = self.terminated.first().copied() else {
                break;
            };
            self.terminated.remove(0);
            out.push(StepRep::Failed {
                request_id,
                failure: StepFailure::Terminated,
            });
        }

        if out.len() < budget {
            if let Some(worker) = self.worker.as_mut() {
                let health = worker.poll(budget - out.len(), &mut out);
                if health == BackendHealth::Lost {
                    self.mark_worker_failed();
                }
            }
        }

        if out.len() < budget {
            let remaining = budget - out.len();
            self.inline.poll(remaining, &mut out);
        }
        out
    }
}
