//! Batching and offload paths agree with the single-generation rule.

use std::time::Duration;

use app::RuntimeConfig;
use life_core::GridModel;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use service_abi::{Cell, RequestId, Service, StepCmd, StepRep};
use services_stepper::{OffloadStrategy, StepService};
use world::EngineMode;

use crate::support::{cells, runtime, sorted, stepper, GLIDER};

const WAIT: Duration = Duration::from_secs(5);

fn step_through_runtime(config: RuntimeConfig, steps: usize) -> (u64, Vec<Cell>) {
    let mut runtime = runtime(config);
    runtime.load_cells(cells(&GLIDER), 0);
    for _ in 0..steps {
        assert!(runtime.step());
        assert!(runtime.wait_for_pending(WAIT));
    }
    (runtime.generation(), sorted(runtime.live_cells()))
}

#[test]
fn glider_twelve_single_steps_equal_three_batches_of_four() {
    let single = step_through_runtime(
        RuntimeConfig {
            stepper: stepper(OffloadStrategy::Inline),
            ..RuntimeConfig::default()
        },
        12,
    );
    let batched = step_through_runtime(
        RuntimeConfig {
            engine_mode: EngineMode::Hashlife,
            skip_exponent: Some(2),
            stepper: stepper(OffloadStrategy::Thread),
            ..RuntimeConfig::default()
        },
        3,
    );

    assert_eq!(single, batched);
    let shifted: Vec<Cell> = GLIDER
        .iter()
        .map(|&(x, y)| Cell::new(x + 3, y + 3))
        .collect();
    assert_eq!(single, (12, sorted(shifted)));
}

fn run_once(service: &mut StepService, cells: Vec<Cell>) -> Vec<Cell> {
    let id = RequestId(1);
    service.try_submit(StepCmd::new(id, cells, 1));
    let deadline = std::time::Instant::now() + WAIT;
    loop {
        for report in service.drain(8) {
            match report {
                StepRep::Done(outcome) if outcome.request_id == id => {
                    return sorted(outcome.cells);
                }
                other => panic!("unexpected report {other:?}"),
            }
        }
        assert!(std::time::Instant::now() < deadline, "step timed out");
        std::thread::yield_now();
    }
}

fn cell_set() -> impl Strategy<Value = Vec<Cell>> {
    proptest::collection::btree_set((-6i32..6, -6i32..6), 0..40)
        .prop_map(|set| set.into_iter().map(Cell::from).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn worker_inline_and_model_agree(seed in cell_set()) {
        let mut model = GridModel::new();
        model.set_live_cells(seed.clone(), 0);
        model.step(1);
        let expected = sorted(model.live_cells());

        let mut thread = StepService::new(stepper(OffloadStrategy::Thread));
        let mut inline = StepService::new(stepper(OffloadStrategy::Inline));
        prop_assert_eq!(run_once(&mut thread, seed.clone()), expected.clone());
        prop_assert_eq!(run_once(&mut inline, seed), expected);
    }
}
