//! Cooperative in-process backend.
//!
//! Jobs are advanced a few generations at a time from [`StepBackend::poll`],
//! so a large batch never monopolises the caller's loop for one long stretch.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use life_core::LiveSet;
use log::trace;
use service_abi::{RequestId, StepCmd, StepOutcome, StepRep, SubmitOutcome};
use smallvec::SmallVec;

use crate::backend::{BackendHealth, StepBackend};

/// Default number of generations computed between time-slice checks.
pub const DEFAULT_INLINE_CHUNK: u32 = 8;

/// Default time one poll may spend stepping before yielding.
pub const DEFAULT_INLINE_SLICE: Duration = Duration::from_millis(4);

struct InlineJob {
    request_id: RequestId,
    live: LiveSet,
    generations: u32,
    remaining: u32,
    compute: Duration,
}

/// Steps batches on the caller's thread in bounded chunks.
pub struct InlineBackend {
    queue: VecDeque<InlineJob>,
    chunk: u32,
    slice: Duration,
}

impl InlineBackend {
    pub fn new(chunk: u32, slice: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            chunk: chunk.max(1),
            slice,
        }
    }

    fn run_chunk(&mut self) -> Option<StepRep> {
        let job = self.queue.front_mut()?;
        let started = Instant::now();
        let steps = job.remaining.min(self.chunk);
        job.live.advance(u64::from(steps));
        job.remaining -= steps;
        job.compute += started.elapsed();
        if job.remaining > 0 && !job.live.is_empty() {
            return None;
        }

        let job = self.queue.pop_front()?;
        trace!(
            "stepper.inline.done id={} generations={}",
            job.request_id,
            job.generations
        );
        Some(StepRep::Done(StepOutcome {
            request_id: job.request_id,
            generations: job.generations,
            cells: job.live.to_vec(),
            elapsed_ms: job.compute.as_secs_f64() * 1000.0,
            worker_used: false,
        }))
    }
}

impl Default for InlineBackend {
    fn default() -> Self {
        Self::new(DEFAULT_INLINE_CHUNK, DEFAULT_INLINE_SLICE)
    }
}

impl StepBackend for InlineBackend {
    fn submit(&mut self, cmd: StepCmd) -> Result<(), (SubmitOutcome, StepCmd)> {
        let generations = cmd.generations.max(1);
        self.queue.push_back(InlineJob {
            request_id: cmd.request_id,
            live: cmd.cells.into_iter().collect(),
            generations,
            remaining: generations,
            compute: Duration::ZERO,
        });
        Ok(())
    }

    fn poll(&mut self, max: usize, out: &mut SmallVec<[StepRep; 8]>) -> BackendHealth {
        let budget = if max == 0 { usize::MAX } else { max };
        let deadline = Instant::now() + self.slice;
        let mut emitted = 0;
        let mut first = true;
        while emitted < budget && !self.queue.is_empty() {
            if !first && Instant::now() >= deadline {
                break;
            }
            first = false;
            if let Some(rep) = self.run_chunk() {
                out.push(rep);
                emitted += 1;
            }
        }
        BackendHealth::Healthy
    }

    fn shutdown(&mut self) -> Vec<RequestId> {
        self.queue.drain(..).map(|job| job.request_id).collect()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_abi::Cell;

    fn blinker() -> Vec<Cell> {
        vec![Cell::new(0, 1), Cell::new(1, 1), Cell::new(2, 1)]
    }

    fn poll_all(backend: &mut InlineBackend) -> Vec<StepRep> {
        let mut reports = Vec::new();
        for _ in 0..10_000 {
            let mut out = SmallVec::new();
            backend.poll(8, &mut out);
            reports.extend(out);
            if backend.pending() == 0 {
                break;
            }
        }
        reports
    }

    #[test]
    fn long_batch_spans_several_chunks() {
        let mut backend = InlineBackend::new(2, Duration::ZERO);
        backend
            .submit(StepCmd::new(RequestId(3), blinker(), 7))
            .expect("inline accepts");

        let mut out = SmallVec::new();
        backend.poll(8, &mut out);
        assert!(out.is_empty(), "first chunk covers only two generations");
        assert_eq!(backend.pending(), 1);

        let reports = poll_all(&mut backend);
        assert_eq!(reports.len(), 1);
        let StepRep::Done(outcome) = &reports[0] else {
            panic!("expected success, got {:?}", reports[0]);
        };
        assert_eq!(outcome.request_id, RequestId(3));
        assert_eq!(outcome.generations, 7);
        assert!(!outcome.worker_used);
        let mut cells = outcome.cells.clone();
        cells.sort();
        assert_eq!(cells, vec![Cell::new(1, 0), Cell::new(1, 1), Cell::new(1, 2)]);
    }

    #[test]
    fn empty_input_finishes_immediately() {
        let mut backend = InlineBackend::new(1, Duration::ZERO);
        backend
            .submit(StepCmd::new(RequestId(1), Vec::new(), 1_000))
            .expect("inline accepts");
        let reports = poll_all(&mut backend);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].request_id(), RequestId(1));
    }

    #[test]
    fn shutdown_returns_queued_ids() {
        let mut backend = InlineBackend::default();
        for id in 1..=3 {
            backend
                .submit(StepCmd::new(RequestId(id), blinker(), 4))
                .expect("inline accepts");
        }
        assert_eq!(
            backend.shutdown(),
            vec![RequestId(1), RequestId(2), RequestId(3)]
        );
        assert_eq!(backend.pending(), 0);
    }
}
