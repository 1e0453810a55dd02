//! Message contract spoken with the background stepping worker.
//!
//! The shapes are internal, but they are serde-tagged so a worker living in
//! another runtime (or a recorded trace) can use the same field names.

use serde::{Deserialize, Serialize};

use crate::{Cell, RequestId};

/// Host → worker message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMsg {
    #[serde(rename_all = "camelCase")]
    Step {
        request_id: RequestId,
        generations: u32,
        cells: Vec<Cell>,
    },
}

/// Worker → host message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerReply {
    #[serde(rename_all = "camelCase")]
    StepResult {
        request_id: RequestId,
        generations: u32,
        cells: Vec<Cell>,
        elapsed_ms: f64,
    },
    #[serde(rename_all = "camelCase")]
    StepError {
        request_id: RequestId,
        message: String,
    },
}

impl WorkerReply {
    pub fn request_id(&self) -> RequestId {
        match self {
            WorkerReply::StepResult { request_id, .. } | WorkerReply::StepError { request_id, .. } => {
                *request_id
            }
        }
    }
}
