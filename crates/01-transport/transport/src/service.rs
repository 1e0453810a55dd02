//! Service trait and outcome types.

use smallvec::SmallVec;

/// Non-blocking service trait implemented by backend adapters.
pub trait Service {
    /// Command type accepted by the service.
    type Cmd: Send + 'static;
    /// Report type produced by the service.
    type Rep: Send + 'static;

    /// Attempts to submit a command without blocking.
    fn try_submit(&mut self, cmd: Self::Cmd) -> SubmitOutcome;

    /// Drains up to `max` reports without blocking. Defaults to empty.
    fn drain(&mut self, _max: usize) -> SmallVec<[Self::Rep; 8]> {
        SmallVec::new()
    }
}

/// Outcome returned when attempting to submit a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Command entered the queue untouched.
    Accepted,
    /// Service could not accept without blocking.
    WouldBlock,
    /// Service is closed or unhealthy.
    Closed,
}
