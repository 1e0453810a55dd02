use thiserror::Error;

/// Result alias used by the transport primitives.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures surfaced by port operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The opposite end of the port has been dropped.
    #[error("port closed")]
    Closed,

    /// Requested a bounded port with zero capacity.
    #[error("invalid port capacity: {0}")]
    InvalidCapacity(usize),
}
