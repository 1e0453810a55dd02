//! Service ABI types shared between the stepping service and the runtime.
//!
//! This crate defines the protocol boundary between the orchestrator (layer 05)
//! and the stepping service (layer 04), with no app-specific dependencies.

mod cell;
pub mod wire;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cell::Cell;
pub use wire::{WorkerMsg, WorkerReply};

// Re-export core service types from transport
pub use transport::{Service, SubmitOutcome};

/// Largest batch any single request may ask for.
pub const MAX_BATCH_GENERATIONS: u32 = 32_768;

/// Identifier echoed unchanged from a request to its report.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Returns the id that follows this one.
    pub fn next(self) -> Self {
        RequestId(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request to advance a cell set by a number of generations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepCmd {
    /// Caller-supplied id, echoed in the report.
    pub request_id: RequestId,
    /// Generations to advance; normalised to at least one.
    pub generations: u32,
    /// Snapshot of the live cells the batch starts from.
    pub cells: Vec<Cell>,
}

impl StepCmd {
    /// Builds a request, clamping `generations` into `1..=MAX_BATCH_GENERATIONS`.
    pub fn new(request_id: RequestId, cells: Vec<Cell>, generations: u32) -> Self {
        Self {
            request_id,
            generations: generations.clamp(1, MAX_BATCH_GENERATIONS),
            cells,
        }
    }
}

/// Successful batch result.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub request_id: RequestId,
    pub generations: u32,
    pub cells: Vec<Cell>,
    /// Wall time spent computing the batch, in milliseconds.
    pub elapsed_ms: f64,
    /// Whether the background worker produced this result (telemetry only).
    pub worker_used: bool,
}

/// Report emitted by the stepping service.
#[derive(Clone, Debug, PartialEq)]
pub enum StepRep {
    /// The batch completed.
    Done(StepOutcome),
    /// The batch failed; only this request is affected.
    Failed {
        request_id: RequestId,
        failure: StepFailure,
    },
}

impl StepRep {
    /// Id of the request this report answers.
    pub fn request_id(&self) -> RequestId {
        match self {
            StepRep::Done(outcome) => outcome.request_id,
            StepRep::Failed { request_id, .. } => *request_id,
        }
    }
}

/// Reasons a batch request can fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepFailure {
    /// The worker reported an error while computing the batch.
    #[error("simulation worker failed: {0}")]
    Worker(String),

    /// The service was shut down before the batch completed.
    #[error("simulation worker terminated")]
    Terminated,
}
