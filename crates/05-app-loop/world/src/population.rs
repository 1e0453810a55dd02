//! Bounded population history and the flat-population heuristic.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Settings for population tracking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub max_history: usize,
    pub window_size: usize,
    pub tolerance: f64,
    /// Pause on a flat population during continuous play.
    pub detect_stable: bool,
}

impl PopulationConfig {
    pub const HISTORY_RANGE: (usize, usize) = (100, 100_000);
    pub const WINDOW_RANGE: (usize, usize) = (1, 1000);

    pub fn normalized(mut self) -> Self {
        self.max_history = self
            .max_history
            .clamp(Self::HISTORY_RANGE.0, Self::HISTORY_RANGE.1);
        self.window_size = self
            .window_size
            .clamp(Self::WINDOW_RANGE.0, Self::WINDOW_RANGE.1);
        self.tolerance = if self.tolerance.is_finite() {
            self.tolerance.max(0.0)
        } else {
            0.0
        };
        self
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_history: 5000,
            window_size: 50,
            tolerance: 0.0,
            detect_stable: false,
        }
    }
}

/// Change between the latest population sample and the one `window` back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopulationChange {
    pub delta: i64,
    pub changing: bool,
}

/// Compares the newest count to the count `window` samples earlier.
///
/// The window is clamped to the available history. Fewer than two samples
/// always count as changing.
pub fn compute_population_change(
    history: &[usize],
    window: usize,
    tolerance: f64,
) -> PopulationChange {
    let Some(&latest) = history.last() else {
        return PopulationChange {
            delta: 0,
            changing: true,
        };
    };
    if history.len() < 2 {
        return PopulationChange {
            delta: 0,
            changing: true,
        };
    }
    let lookback = window.clamp(1, history.len() - 1);
    let comparison = history[history.len() - 1 - lookback];
    let delta = latest as i64 - comparison as i64;
    PopulationChange {
        delta,
        changing: (delta.unsigned_abs() as f64) > tolerance,
    }
}

/// Rolling population history.
#[derive(Clone, Debug)]
pub struct PopulationTracker {
    config: PopulationConfig,
    history: VecDeque<usize>,
}

impl Default for PopulationTracker {
    fn default() -> Self {
        Self::new(PopulationConfig::default())
    }
}

impl PopulationTracker {
    /// Samples required before the flat-population heuristic may fire.
    pub const MIN_SAMPLES: usize = 4;

    pub fn new(config: PopulationConfig) -> Self {
        Self {
            config: config.normalized(),
            history: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn set_detect_stable(&mut self, enabled: bool) {
        self.config.detect_stable = enabled;
    }

    pub fn set_window_size(&mut self, window: usize) {
        self.config.window_size = window;
        self.config = self.config.clone().normalized();
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.config.tolerance = tolerance;
        self.config = self.config.clone().normalized();
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.config.max_history = max_history;
        self.config = self.config.clone().normalized();
        self.trim();
    }

    pub fn history(&self) -> Vec<usize> {
        self.history.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Restarts the history from a single sample without evaluating it.
    pub fn reset_with(&mut self, population: usize) {
        self.history.clear();
        self.history.push_back(population);
    }

    /// Appends a sample and reports whether the population has gone flat.
    ///
    /// Always `false` while detection is disabled.
    pub fn record(&mut self, population: usize) -> bool {
        self.history.push_back(population);
        self.trim();
        if !self.config.detect_stable || self.history.len() < Self::MIN_SAMPLES {
            return false;
        }
        let change = compute_population_change(
            self.history.make_contiguous(),
            self.config.window_size,
            self.config.tolerance,
        );
        !change.changing
    }

    fn trim(&mut self) {
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_uses_clamped_window() {
        let change = compute_population_change(&[5, 9, 9], 50, 0.0);
        assert_eq!(change.delta, 4);
        assert!(change.changing);

        let change = compute_population_change(&[5, 9, 9], 1, 0.0);
        assert_eq!(change.delta, 0);
        assert!(!change.changing);

        assert!(compute_population_change(&[7], 1, 0.0).changing);
    }

    #[test]
    fn tolerance_absorbs_small_swings() {
        let change = compute_population_change(&[10, 12], 1, 2.0);
        assert!(!change.changing);
    }

    #[test]
    fn heuristic_needs_four_samples_and_opt_in() {
        let mut tracker = PopulationTracker::default();
        for _ in 0..6 {
            assert!(!tracker.record(4));
        }

        let mut tracker = PopulationTracker::new(PopulationConfig {
            detect_stable: true,
            window_size: 1,
            ..PopulationConfig::default()
        });
        assert!(!tracker.record(4));
        assert!(!tracker.record(4));
        assert!(!tracker.record(4));
        assert!(tracker.record(4));
    }

    #[test]
    fn settings_are_clamped() {
        let mut tracker = PopulationTracker::default();
        tracker.set_max_history(5);
        tracker.set_window_size(0);
        tracker.set_tolerance(f64::NAN);
        assert_eq!(tracker.config().max_history, 100);
        assert_eq!(tracker.config().window_size, 1);
        assert_eq!(tracker.config().tolerance, 0.0);

        for i in 0..150 {
            tracker.record(i);
        }
        assert_eq!(tracker.len(), 100);
        assert_eq!(tracker.history()[0], 50);
    }
}
