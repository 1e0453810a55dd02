//! Channel primitives shared by the host loop and the stepping worker.
//!
//! This crate exposes the foundational pieces the upper layers build on:
//! * [`Service`] / [`SubmitOutcome`] – the non-blocking submit/drain contract.
//! * [`make_port_pair`] – a producer/consumer port over a crossbeam channel.
//! * [`TransportError`] – lightweight error surface for closed ports.

mod error;
mod port;
mod service;

pub use error::{TransportError, TransportResult};
pub use port::{make_port_pair, ConsumerPort, PortMetricsSnapshot, PortPair, ProducerPort};
pub use service::{Service, SubmitOutcome};
