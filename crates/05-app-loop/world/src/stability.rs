//! Exact-state period detection and steady-state classification.
//!
//! A state hash is the row-major sorted list of live cells rendered as
//! `"x,y"` pairs joined with `;`. Two sets with the same members hash the
//! same regardless of iteration order, so a repeat in a rolling history of
//! hashes means the pattern has entered a cycle.

use std::collections::VecDeque;
use std::fmt;

use life_core::LiveSet;
use serde::{Deserialize, Serialize};
use service_abi::Cell;

/// Steady-state verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityPattern {
    StillLife,
    Oscillator(u32),
    /// Population stopped changing but no exact repeat was observed.
    StablePopulation,
}

impl StabilityPattern {
    /// Verdict for an exact period; `None` when no period was found.
    pub fn from_period(period: u32) -> Option<Self> {
        match period {
            0 => None,
            1 => Some(StabilityPattern::StillLife),
            p => Some(StabilityPattern::Oscillator(p)),
        }
    }

    /// Period reported alongside the verdict; unclassified populations report 1.
    pub fn period(self) -> u32 {
        match self {
            StabilityPattern::StillLife | StabilityPattern::StablePopulation => 1,
            StabilityPattern::Oscillator(p) => p,
        }
    }
}

impl fmt::Display for StabilityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityPattern::StillLife => f.write_str("Still Life"),
            StabilityPattern::Oscillator(p) => write!(f, "Oscillator (Period {p})"),
            StabilityPattern::StablePopulation => f.write_str("Stable Population (Unclassified)"),
        }
    }
}

/// Published when the runtime halts on a steady state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityEvent {
    pub pattern: StabilityPattern,
    pub generation: u64,
    pub population: usize,
    pub period: u32,
}

/// Canonical, order-independent signature of a cell set.
pub fn build_cell_state_hash<'a, I>(cells: I) -> String
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut sorted: Vec<Cell> = cells.into_iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut out = String::with_capacity(sorted.len() * 6);
    for (i, cell) in sorted.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&cell.to_string());
    }
    out
}

/// Smallest `p` in `1..=max_lookback` with `history[last] == history[last - p]`, or 0.
pub fn detect_state_period<S: AsRef<str>>(history: &[S], max_lookback: usize) -> u32 {
    let Some((latest, earlier)) = history.split_last() else {
        return 0;
    };
    let latest = latest.as_ref();
    earlier
        .iter()
        .rev()
        .take(max_lookback)
        .position(|hash| hash.as_ref() == latest)
        .map_or(0, |index| (index + 1) as u32)
}

/// Rolling hash history fed one observation at a time.
#[derive(Clone, Debug)]
pub struct StateHistory {
    hashes: VecDeque<String>,
    lookback: usize,
}

impl StateHistory {
    pub fn new(lookback: usize) -> Self {
        let lookback = lookback.max(1);
        Self {
            hashes: VecDeque::with_capacity(lookback + 1),
            lookback,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    /// Records a state and returns the period it closes, or 0.
    pub fn observe<'a, I>(&mut self, cells: I) -> u32
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        self.observe_hash(build_cell_state_hash(cells))
    }

    pub fn observe_hash(&mut self, hash: String) -> u32 {
        self.hashes.push_back(hash);
        while self.hashes.len() > self.lookback + 1 {
            self.hashes.pop_front();
        }
        detect_state_period(self.hashes.make_contiguous(), self.lookback)
    }
}

/// Result of an explicit steady-state probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SteadyState {
    pub pattern: StabilityPattern,
    pub period: u32,
    /// Generations advanced from the probe's start when the repeat was seen.
    pub generations: u64,
}

/// Steps a copy of `live` one generation at a time until a state repeats.
///
/// Returns `None` if no repeat within `lookback` appears in `max_generations`.
pub fn find_steady_state(
    live: &LiveSet,
    max_generations: u64,
    lookback: usize,
) -> Option<SteadyState> {
    let mut current = live.clone();
    let mut history = StateHistory::new(lookback);
    history.observe(&current);
    for advanced in 1..=max_generations {
        current = current.next_generation();
        let period = history.observe(&current);
        if let Some(pattern) = StabilityPattern::from_period(period) {
            return Some(SteadyState {
                pattern,
                period,
                generations: advanced,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cells: &[(i32, i32)]) -> Vec<Cell> {
        cells.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn hash_is_row_major() {
        assert_eq!(build_cell_state_hash(&set(&[(2, 3), (1, 1)])), "1,1;2,3");
        assert_eq!(build_cell_state_hash(&set(&[(1, 1), (2, 3)])), "1,1;2,3");
        assert_eq!(build_cell_state_hash(&set(&[(5, 0), (0, 1)])), "5,0;0,1");
        assert_eq!(build_cell_state_hash(&[] as &[Cell]), "");
    }

    #[test]
    fn period_scan_respects_lookback() {
        let history = ["a", "b", "c", "a"];
        assert_eq!(detect_state_period(&history, 8), 3);
        assert_eq!(detect_state_period(&history, 2), 0);
        assert_eq!(detect_state_period(&["x"], 8), 0);
        assert_eq!(detect_state_period::<&str>(&[], 8), 0);
    }

    #[test]
    fn history_wraps_without_losing_periods() {
        let mut history = StateHistory::new(2);
        let states = ["a", "b", "c", "d", "c"];
        let periods: Vec<u32> = states
            .iter()
            .map(|s| history.observe_hash(s.to_string()))
            .collect();
        assert_eq!(periods, vec![0, 0, 0, 0, 2]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn labels() {
        assert_eq!(StabilityPattern::StillLife.to_string(), "Still Life");
        assert_eq!(
            StabilityPattern::from_period(2).map(|p| p.to_string()),
            Some("Oscillator (Period 2)".to_string())
        );
        assert_eq!(
            StabilityPattern::StablePopulation.to_string(),
            "Stable Population (Unclassified)"
        );
        assert_eq!(StabilityPattern::from_period(0), None);
    }

    #[test]
    fn probe_finds_blinker_period() {
        let blinker: LiveSet = set(&[(0, 1), (1, 1), (2, 1)]).into_iter().collect();
        let found = find_steady_state(&blinker, 10, 64).expect("blinker repeats");
        assert_eq!(found.pattern, StabilityPattern::Oscillator(2));
        assert_eq!(found.generations, 2);
        assert_eq!(blinker.len(), 3);
    }
}
