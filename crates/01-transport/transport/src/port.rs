use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use smallvec::SmallVec;

use crate::error::{TransportError, TransportResult};
use crate::service::SubmitOutcome;

/// Sending half of a port.
pub struct ProducerPort<T> {
    tx: Sender<T>,
    metrics: Arc<PortMetrics>,
}

impl<T> Clone for ProducerPort<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T> ProducerPort<T> {
    /// Attempts to enqueue `msg` without blocking.
    ///
    /// On `WouldBlock` or `Closed` the message is handed back so the caller can
    /// retry or fail it explicitly.
    pub fn try_send(&self, msg: T) -> Result<SubmitOutcome, (SubmitOutcome, T)> {
        let result = match self.tx.try_send(msg) {
            Ok(()) => Ok(SubmitOutcome::Accepted),
            Err(TrySendError::Full(msg)) => Err((SubmitOutcome::WouldBlock, msg)),
            Err(TrySendError::Disconnected(msg)) => Err((SubmitOutcome::Closed, msg)),
        };
        let outcome = match &result {
            Ok(outcome) => *outcome,
            Err((outcome, _)) => *outcome,
        };
        self.metrics.record(outcome);
        result
    }

    pub fn metrics(&self) -> PortMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Receiving half of a port.
pub struct ConsumerPort<T> {
    rx: Receiver<T>,
    metrics: Arc<PortMetrics>,
}

impl<T> ConsumerPort<T> {
    /// Drains up to `max` queued messages without blocking.
    ///
    /// Returns [`TransportError::Closed`] only when the port is empty and every
    /// producer has been dropped.
    pub fn drain(&self, max: usize) -> TransportResult<SmallVec<[T; 8]>> {
        let mut out = SmallVec::new();
        while out.len() < max {
            match self.rx.try_recv() {
                Ok(msg) => out.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if out.is_empty() {
                        return Err(TransportError::Closed);
                    }
                    break;
                }
            }
        }
        Ok(out)
    }

    /// Blocks for at most `timeout` waiting for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> TransportResult<Option<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Number of messages waiting in the port.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn metrics(&self) -> PortMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[derive(Default)]
struct PortMetrics {
    accepted: AtomicU32,
    would_block: AtomicU32,
    closed: AtomicU32,
}

impl PortMetrics {
    fn record(&self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Accepted => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
            }
            SubmitOutcome::WouldBlock => {
                self.would_block.fetch_add(1, Ordering::Relaxed);
            }
            SubmitOutcome::Closed => {
                self.closed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self) -> PortMetricsSnapshot {
        PortMetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            would_block: self.would_block.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters for a port's send outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortMetricsSnapshot {
    pub accepted: u32,
    pub would_block: u32,
    pub closed: u32,
}

pub struct PortPair<T> {
    pub producer: ProducerPort<T>,
    pub consumer: ConsumerPort<T>,
}

/// Builds a port pair. `capacity` of `None` yields an unbounded port.
pub fn make_port_pair<T>(capacity: Option<usize>) -> TransportResult<PortPair<T>> {
    let (tx, rx) = match capacity {
        Some(0) => return Err(TransportError::InvalidCapacity(0)),
        Some(cap) => crossbeam_channel::bounded(cap),
        None => crossbeam_channel::unbounded(),
    };
    let metrics = Arc::new(PortMetrics::default());
    Ok(PortPair {
        producer: ProducerPort {
            tx,
            metrics: Arc::clone(&metrics),
        },
        consumer: ConsumerPort { rx, metrics },
    })
}
