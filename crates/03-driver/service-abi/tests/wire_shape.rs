//! The worker contract keeps its camelCase, `type`-tagged field names.

use serde_json::json;
use service_abi::{Cell, RequestId, StepCmd, WorkerMsg, WorkerReply, MAX_BATCH_GENERATIONS};

#[test]
fn step_message_uses_tagged_camel_case() {
    let msg = WorkerMsg::Step {
        request_id: RequestId(7),
        generations: 4,
        cells: vec![Cell::new(1, 2)],
    };

    let value = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(
        value,
        json!({
            "type": "step",
            "requestId": 7,
            "generations": 4,
            "cells": [{ "x": 1, "y": 2 }]
        })
    );
}

#[test]
fn replies_round_trip_through_json() {
    let raw = json!({
        "type": "stepError",
        "requestId": 3,
        "message": "boom"
    });
    let reply: WorkerReply = serde_json::from_value(raw).expect("deserialize");
    assert_eq!(
        reply,
        WorkerReply::StepError {
            request_id: RequestId(3),
            message: "boom".to_string()
        }
    );
    assert_eq!(reply.request_id(), RequestId(3));
}

#[test]
fn step_cmd_clamps_generation_count() {
    assert_eq!(StepCmd::new(RequestId(1), Vec::new(), 0).generations, 1);
    assert_eq!(
        StepCmd::new(RequestId(1), Vec::new(), u32::MAX).generations,
        MAX_BATCH_GENERATIONS
    );
}
