//! Bounded, throttled ring of generation snapshots for rewinding.

use std::sync::Arc;

use log::trace;
use serde::{Deserialize, Serialize};
use service_abi::Cell;

/// Capture limits for [`CheckpointStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub max_checkpoints: usize,
    pub min_generation_gap: u64,
    pub min_interval_ms: u64,
    /// Populations above this size are never captured.
    pub max_cells: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            max_checkpoints: 12,
            min_generation_gap: 64,
            min_interval_ms: 1500,
            max_cells: 50_000,
        }
    }
}

/// Immutable snapshot of the live cells at one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub id: u64,
    pub generation: u64,
    pub live_count: usize,
    pub created_at_ms: u64,
    pub cells: Arc<[Cell]>,
}

/// Why a capture attempt did not produce a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureSkip {
    Empty,
    TooLarge,
    GenerationGap,
    TooSoon,
}

/// Most-recent-first checkpoint list with generation and time throttling.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    config: CheckpointConfig,
    checkpoints: Vec<Checkpoint>,
    next_id: u64,
    last_generation: Option<u64>,
    last_capture_ms: Option<u64>,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(CheckpointConfig::default())
    }
}

impl CheckpointStore {
    pub fn new(config: CheckpointConfig) -> Self {
        Self {
            config,
            checkpoints: Vec::new(),
            next_id: 1,
            last_generation: None,
            last_capture_ms: None,
        }
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Stored checkpoints, newest first.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Captures a copy of `cells` unless throttled.
    ///
    /// `force` bypasses the generation-gap and interval rules but never the
    /// empty or size checks.
    pub fn add_checkpoint(
        &mut self,
        generation: u64,
        cells: &[Cell],
        now_ms: u64,
        force: bool,
    ) -> Result<&Checkpoint, CaptureSkip> {
        if cells.is_empty() {
            return Err(CaptureSkip::Empty);
        }
        if cells.len() > self.config.max_cells {
            trace!(
                "checkpoint.skip.too_large cells={} max={}",
                cells.len(),
                self.config.max_cells
            );
            return Err(CaptureSkip::TooLarge);
        }
        if !force {
            if let Some(last) = self.last_generation {
                if generation.abs_diff(last) < self.config.min_generation_gap {
                    return Err(CaptureSkip::GenerationGap);
                }
            }
            if let Some(last) = self.last_capture_ms {
                if now_ms.saturating_sub(last) < self.config.min_interval_ms {
                    return Err(CaptureSkip::TooSoon);
                }
            }
        }

        let checkpoint = Checkpoint {
            id: self.next_id,
            generation,
            live_count: cells.len(),
            created_at_ms: now_ms,
            cells: Arc::from(cells),
        };
        self.next_id += 1;
        self.last_generation = Some(generation);
        self.last_capture_ms = Some(now_ms);
        self.checkpoints.insert(0, checkpoint);
        self.checkpoints.truncate(self.config.max_checkpoints.max(1));
        trace!(
            "checkpoint.captured id={} generation={generation} cells={}",
            self.checkpoints[0].id,
            cells.len()
        );
        Ok(&self.checkpoints[0])
    }

    /// Exact id lookup.
    pub fn restore_checkpoint(&self, id: u64) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|checkpoint| checkpoint.id == id)
    }

    /// Drops every checkpoint and resets throttling. Ids keep increasing.
    pub fn clear(&mut self) {
        self.checkpoints.clear();
        self.last_generation = None;
        self.last_capture_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: i32) -> Vec<Cell> {
        (0..n).map(|x| Cell::new(x, 0)).collect()
    }

    #[test]
    fn generation_gap_blocks_second_capture() {
        let mut store = CheckpointStore::default();
        assert!(store.add_checkpoint(100, &cells(3), 0, false).is_ok());
        assert_eq!(
            store.add_checkpoint(101, &cells(3), 10_000, false).unwrap_err(),
            CaptureSkip::GenerationGap
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn interval_throttles_unless_forced() {
        let mut store = CheckpointStore::default();
        store.add_checkpoint(0, &cells(1), 1_000, false).unwrap();
        assert_eq!(
            store.add_checkpoint(500, &cells(1), 2_000, false).unwrap_err(),
            CaptureSkip::TooSoon
        );
        assert!(store.add_checkpoint(501, &cells(1), 2_000, true).is_ok());
        assert!(store.add_checkpoint(502, &cells(1), 2_000, true).is_ok());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn empty_and_oversized_sets_are_skipped_even_when_forced() {
        let mut store = CheckpointStore::new(CheckpointConfig {
            max_cells: 4,
            ..CheckpointConfig::default()
        });
        assert_eq!(
            store.add_checkpoint(0, &[], 0, true).unwrap_err(),
            CaptureSkip::Empty
        );
        assert_eq!(
            store.add_checkpoint(0, &cells(5), 0, true).unwrap_err(),
            CaptureSkip::TooLarge
        );
        assert!(store.is_empty());
    }

    #[test]
    fn ring_keeps_newest_first_and_evicts_oldest() {
        let mut store = CheckpointStore::default();
        for i in 0..15u64 {
            store
                .add_checkpoint(i * 64, &cells(2), i * 1_500, false)
                .unwrap();
        }
        let ids: Vec<u64> = store.checkpoints().iter().map(|c| c.id).collect();
        assert_eq!(ids, (4..=15).rev().collect::<Vec<_>>());
        assert!(store.restore_checkpoint(3).is_none());
        assert_eq!(store.restore_checkpoint(15).map(|c| c.generation), Some(14 * 64));
    }

    #[test]
    fn clear_resets_throttle_but_not_ids() {
        let mut store = CheckpointStore::default();
        store.add_checkpoint(10, &cells(1), 0, false).unwrap();
        store.clear();
        assert!(store.is_empty());
        let id = store.add_checkpoint(11, &cells(1), 1, false).unwrap().id;
        assert_eq!(id, 2);
    }
}
