#![allow(missing_docs)]

//! Cell-state model and stepping rule for the Life engine.
//!
//! [`LiveSet`] is the canonical set of live cells and knows how to advance
//! itself one generation at a time. [`GridModel`] wraps it with the
//! generation counter and the editing operations the runtime exposes.

pub mod live_set;
pub mod model;

pub use live_set::LiveSet;
pub use model::GridModel;
pub use service_abi::Cell;
