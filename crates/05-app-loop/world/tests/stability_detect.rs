//! Detector and checkpoint behaviour driven through the public API.

use life_core::LiveSet;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use service_abi::Cell;
use world::{build_cell_state_hash, CheckpointStore, StabilityPattern, StateHistory};

fn cells(raw: &[(i32, i32)]) -> Vec<Cell> {
    raw.iter().copied().map(Cell::from).collect()
}

#[test]
fn block_is_still_life_within_two_observations() {
    let mut live: LiveSet = cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]).into_iter().collect();
    let mut history = StateHistory::new(64);

    assert_eq!(history.observe(&live), 0);
    live = live.next_generation();
    let period = history.observe(&live);
    assert_eq!(StabilityPattern::from_period(period), Some(StabilityPattern::StillLife));
}

#[test]
fn blinker_is_period_two_oscillator() {
    let mut live: LiveSet = cells(&[(0, 1), (1, 1), (2, 1)]).into_iter().collect();
    let mut history = StateHistory::new(64);
    let mut verdict = None;
    for _ in 0..4 {
        verdict = StabilityPattern::from_period(history.observe(&live));
        if verdict.is_some() {
            break;
        }
        live = live.next_generation();
    }
    assert_eq!(
        verdict.map(|pattern| pattern.to_string()),
        Some("Oscillator (Period 2)".to_string())
    );
}

#[test]
fn glider_never_repeats_exactly() {
    let mut live: LiveSet = cells(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)])
        .into_iter()
        .collect();
    let mut history = StateHistory::new(64);
    for _ in 0..40 {
        assert_eq!(history.observe(&live), 0);
        live = live.next_generation();
    }
}

#[test]
fn checkpoint_cells_are_copied_on_capture() {
    let mut store = CheckpointStore::default();
    let mut source = cells(&[(3, 3), (4, 4)]);
    let id = store.add_checkpoint(200, &source, 0, false).expect("captured").id;
    assert!(store.add_checkpoint(201, &source, 0, false).is_err());

    source[0] = Cell::new(99, 99);
    source.push(Cell::new(7, 7));

    let stored = store.restore_checkpoint(id).expect("present");
    assert_eq!(stored.cells.to_vec(), cells(&[(3, 3), (4, 4)]));
    assert_eq!(stored.live_count, 2);
    assert_eq!(store.len(), 1);
}

proptest! {
    #[test]
    fn hash_ignores_input_order(
        raw in proptest::collection::vec((-50i32..50, -50i32..50), 0..40),
        seed in any::<u64>(),
    ) {
        let forward = cells(&raw);
        let mut shuffled = forward.clone();
        // Deterministic permutation driven by the seed.
        let len = shuffled.len();
        let mut state = seed;
        for i in (1..len).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }
        prop_assert_eq!(build_cell_state_hash(&forward), build_cell_state_hash(&shuffled));
    }
}
