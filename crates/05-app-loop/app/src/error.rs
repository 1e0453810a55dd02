use service_abi::{RequestId, StepFailure, SubmitOutcome};
use thiserror::Error;

/// Errors surfaced to the runtime's error callback.
///
/// None of these stop the loop.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("step {request_id} failed: {failure}")]
    StepFailed {
        request_id: RequestId,
        failure: StepFailure,
    },

    #[error("step {request_id} was not accepted: {outcome:?}")]
    SubmitRejected {
        request_id: RequestId,
        outcome: SubmitOutcome,
    },
}
