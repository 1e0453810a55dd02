//! Background worker-thread backend.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use log::{error, trace, warn};
use runtime_native::{NativeWorker, WorkerEngine, WorkerOptions};
use service_abi::{
    RequestId, StepCmd, StepFailure, StepOutcome, StepRep, SubmitOutcome, WorkerMsg,
    WorkerReply,
};
use smallvec::SmallVec;

use crate::backend::{BackendHealth, StepBackend};
use crate::kernel::{life_kernel, StepKernel};

/// Engine run on the worker thread: decodes step messages and runs the kernel.
pub struct LifeWorkerEngine {
    kernel: StepKernel,
}

impl LifeWorkerEngine {
    pub fn new(kernel: StepKernel) -> Self {
        Self { kernel }
    }
}

impl WorkerEngine for LifeWorkerEngine {
    type Cmd = WorkerMsg;
    type Rep = WorkerReply;

    fn handle(&mut self, cmd: WorkerMsg, out: &mut Vec<WorkerReply>) {
        let WorkerMsg::Step {
            request_id,
            generations,
            cells,
        } = cmd;
        let generations = generations.max(1);
        let started = Instant::now();
        let kernel = self.kernel;

        let result = panic::catch_unwind(AssertUnwindSafe(|| kernel(cells, generations)));
        let reply = match result {
            Ok(Ok(cells)) => WorkerReply::StepResult {
                request_id,
                generations,
                cells,
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            },
            Ok(Err(message)) => WorkerReply::StepError {
                request_id,
                message,
            },
            Err(payload) => WorkerReply::StepError {
                request_id,
                message: panic_message(payload.as_ref()),
            },
        };
        out.push(reply);
    }

    fn name(&self) -> &'static str {
        "life-step"
    }
}

struct PendingRequest {
    started_at: Instant,
    generations: u32,
}

/// Runs batches on a dedicated [`NativeWorker`] thread.
pub struct ThreadBackend {
    worker: NativeWorker<WorkerMsg, WorkerReply>,
    pending: HashMap<RequestId, PendingRequest>,
}

impl ThreadBackend {
    /// Spawns a worker running the standard rule.
    pub fn spawn() -> std::io::Result<Self> {
        Self::spawn_with_kernel(life_kernel)
    }

    /// Spawns a worker running `kernel` instead of the standard rule.
    pub fn spawn_with_kernel(kernel: StepKernel) -> std::io::Result<Self> {
        let worker = NativeWorker::spawn(LifeWorkerEngine::new(kernel), WorkerOptions::default())?;
        Ok(Self {
            worker,
            pending: HashMap::new(),
        })
    }

    fn reply_to_rep(&mut self, reply: WorkerReply) -> Option<StepRep> {
        let request_id = reply.request_id();
        let Some(pending) = self.pending.remove(&request_id) else {
            trace!("stepper.thread.unknown_reply id={request_id}");
            return None;
        };
        Some(match reply {
            WorkerReply::StepResult {
                generations,
                cells,
                elapsed_ms,
                ..
            } => StepRep::Done(StepOutcome {
                request_id,
                generations: if generations == 0 {
                    pending.generations
                } else {
                    generations
                },
                cells,
                elapsed_ms: if elapsed_ms.is_finite() {
                    elapsed_ms
                } else {
                    pending.started_at.elapsed().as_secs_f64() * 1000.0
                },
                worker_used: true,
            }),
            WorkerReply::StepError { message, .. } => {
                error!("stepper.thread.step_failed id={request_id} message={message}");
                StepRep::Failed {
                    request_id,
                    failure: StepFailure::Worker(message),
                }
            }
        })
    }
}

impl StepBackend for ThreadBackend {
    fn submit(&mut self, cmd: StepCmd) -> Result<(), (SubmitOutcome, StepCmd)> {
        let StepCmd {
            request_id,
            generations,
            cells,
        } = cmd;
        let msg = WorkerMsg::Step {
            request_id,
            generations,
            cells,
        };
        match self.worker.try_submit(msg) {
            Ok(_) => {
                self.pending.insert(
                    request_id,
                    PendingRequest {
                        started_at: Instant::now(),
                        generations,
                    },
                );
                Ok(())
            }
            Err((outcome, WorkerMsg::Step { cells, .. })) => Err((
                outcome,
                StepCmd {
                    request_id,
                    generations,
                    cells,
                },
            )),
        }
    }

    fn poll(&mut self, max: usize, out: &mut SmallVec<[StepRep; 8]>) -> BackendHealth {
        match self.worker.drain(max) {
            Ok(replies) => {
                for reply in replies {
                    if let Some(rep) = self.reply_to_rep(reply) {
                        out.push(rep);
                    }
                }
                BackendHealth::Healthy
            }
            // Closed only once the thread is gone and every queued reply was drained.
            Err(_) => self.fail_all(out),
        }
    }

    fn shutdown(&mut self) -> Vec<RequestId> {
        self.worker.terminate();
        self.pending.drain().map(|(id, _)| id).collect()
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    fn name(&self) -> &'static str {
        "thread"
    }
}

impl ThreadBackend {
    fn fail_all(&mut self, out: &mut SmallVec<[StepRep; 8]>) -> BackendHealth {
        warn!(
            "stepper.thread.lost pending={} name={}",
            self.pending.len(),
            self.worker.name()
        );
        for (request_id, _) in self.pending.drain() {
            out.push(StepRep::Failed {
                request_id,
                failure: StepFailure::Worker("worker thread exited".to_string()),
            });
        }
        BackendHealth::Lost
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "simulation worker failed".to_string()
    }
}
