//! Offload strategy seam shared by the worker-thread and inline backends.

use service_abi::{RequestId, StepCmd, StepRep, SubmitOutcome};
use smallvec::SmallVec;

/// Whether a backend can keep serving requests after a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendHealth {
    /// Backend is usable.
    Healthy,
    /// Backend died; its outstanding requests were failed into the poll output.
    Lost,
}

/// Executes batch step requests somewhere, reporting results on poll.
pub trait StepBackend: Send {
    /// Queues a request. Hands the command back if the backend cannot take it.
    fn submit(&mut self, cmd: StepCmd) -> Result<(), (SubmitOutcome, StepCmd)>;

    /// Appends up to `max` finished reports to `out`.
    fn poll(&mut self, max: usize, out: &mut SmallVec<[StepRep; 8]>) -> BackendHealth;

    /// Stops the backend and returns the ids of requests it abandoned.
    fn shutdown(&mut self) -> Vec<RequestId>;

    /// Requests submitted but not yet reported.
    fn pending(&self) -> usize;

    fn name(&self) -> &'static str;
}
