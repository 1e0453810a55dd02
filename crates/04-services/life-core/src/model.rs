//! Authoritative grid state: live cells plus the generation counter.

use service_abi::Cell;

use crate::live_set::LiveSet;

/// Grid state owned by the runtime.
///
/// The generation counter only moves backwards through [`GridModel::clear`]
/// and [`GridModel::set_live_cells`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridModel {
    live: LiveSet,
    generation: u64,
}

impl GridModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn live(&self) -> &LiveSet {
        &self.live
    }

    pub fn population(&self) -> usize {
        self.live.len()
    }

    pub fn live_cells(&self) -> Vec<Cell> {
        self.live.to_vec()
    }

    /// Replaces the whole state at once. Duplicate cells collapse.
    pub fn set_live_cells<I>(&mut self, cells: I, generation: u64)
    where
        I: IntoIterator<Item = Cell>,
    {
        self.live = cells.into_iter().collect();
        self.generation = generation;
    }

    /// Like [`GridModel::set_live_cells`] for loosely typed input.
    ///
    /// Non-finite coordinates are dropped and a negative or non-finite
    /// generation becomes zero.
    pub fn set_live_cells_lossy<I>(&mut self, cells: I, generation: f64)
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let generation = if generation.is_finite() && generation > 0.0 {
            generation.trunc() as u64
        } else {
            0
        };
        self.set_live_cells(
            cells.into_iter().filter_map(|(x, y)| Cell::from_f64(x, y)),
            generation,
        );
    }

    pub fn set_cell_alive(&mut self, x: i32, y: i32, alive: bool) {
        let cell = Cell::new(x, y);
        if alive {
            self.live.insert(cell);
        } else {
            self.live.remove(cell);
        }
    }

    /// Flips a cell and returns its new state.
    pub fn toggle_cell(&mut self, x: i32, y: i32) -> bool {
        self.live.toggle(Cell::new(x, y))
    }

    pub fn is_cell_alive(&self, x: i32, y: i32) -> bool {
        self.live.contains(Cell::new(x, y))
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.generation = 0;
    }

    /// Applies the rule `generations` times, then bumps the counter once.
    ///
    /// A request for zero generations is treated as one.
    pub fn step(&mut self, generations: u64) {
        let steps = generations.max(1);
        self.live.advance(steps);
        self.generation = self.generation.saturating_add(steps);
    }
}
