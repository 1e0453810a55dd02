//! Canonical live-cell set and the birth/survival rule.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use service_abi::Cell;

/// Unordered set of unique live cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveSet {
    cells: HashSet<Cell>,
}

impl LiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: HashSet::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Inserts `cell`, returning `true` if it was not already alive.
    pub fn insert(&mut self, cell: Cell) -> bool {
        self.cells.insert(cell)
    }

    /// Removes `cell`, returning `true` if it was alive.
    pub fn remove(&mut self, cell: Cell) -> bool {
        self.cells.remove(&cell)
    }

    /// Flips `cell` and returns its new state.
    pub fn toggle(&mut self, cell: Cell) -> bool {
        if self.cells.remove(&cell) {
            false
        } else {
            self.cells.insert(cell);
            true
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    /// Live cells in unspecified order.
    pub fn to_vec(&self) -> Vec<Cell> {
        self.cells.iter().copied().collect()
    }

    /// Live cells in row-major order.
    pub fn to_sorted_vec(&self) -> Vec<Cell> {
        let mut cells = self.to_vec();
        cells.sort_unstable();
        cells
    }

    /// Computes the next generation.
    ///
    /// Neighbour counts are accumulated from the current set only, so the
    /// result never observes a partially updated generation.
    pub fn next_generation(&self) -> LiveSet {
        let mut counts: HashMap<Cell, u8> = HashMap::with_capacity(self.cells.len() * 8);
        for cell in &self.cells {
            for neighbor in cell.neighbors() {
                match counts.entry(neighbor) {
                    Entry::Occupied(mut slot) => *slot.get_mut() += 1,
                    Entry::Vacant(slot) => {
                        slot.insert(1);
                    }
                }
            }
        }

        let mut next = LiveSet::with_capacity(self.cells.len());
        for (cell, count) in counts {
            if count == 3 || (count == 2 && self.cells.contains(&cell)) {
                next.cells.insert(cell);
            }
        }
        next
    }

    /// Advances in place by `generations` sequential steps.
    pub fn advance(&mut self, generations: u64) {
        for _ in 0..generations {
            if self.cells.is_empty() {
                break;
            }
            *self = self.next_generation();
        }
    }
}

impl FromIterator<Cell> for LiveSet {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Extend<Cell> for LiveSet {
    fn extend<I: IntoIterator<Item = Cell>>(&mut self, iter: I) {
        self.cells.extend(iter);
    }
}

impl<'a> IntoIterator for &'a LiveSet {
    type Item = &'a Cell;
    type IntoIter = std::collections::hash_set::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
