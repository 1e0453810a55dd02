use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A live-cell coordinate on the unbounded grid.
///
/// Cells order row-major: by `y` first, then `x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coerces loosely typed coordinates, truncating toward zero.
    ///
    /// Returns `None` for non-finite values or values outside the `i32` range.
    pub fn from_f64(x: f64, y: f64) -> Option<Self> {
        Some(Self::new(coerce(x)?, coerce(y)?))
    }

    /// The eight neighbouring coordinates that exist on the `i32` grid.
    pub fn neighbors(self) -> impl Iterator<Item = Cell> {
        const OFFSETS: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.into_iter().filter_map(move |(dx, dy)| {
            Some(Cell::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
        })
    }
}

fn coerce(value: f64) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return None;
    }
    Some(truncated as i32)
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Cell::new(x, y)
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_truncates_and_drops_invalid() {
        assert_eq!(Cell::from_f64(2.9, -1.5), Some(Cell::new(2, -1)));
        assert_eq!(Cell::from_f64(f64::NAN, 0.0), None);
        assert_eq!(Cell::from_f64(0.0, f64::INFINITY), None);
        assert_eq!(Cell::from_f64(1e12, 0.0), None);
    }

    #[test]
    fn neighbors_skip_coordinates_past_the_edge() {
        assert_eq!(Cell::new(0, 0).neighbors().count(), 8);
        assert_eq!(Cell::new(i32::MAX, 0).neighbors().count(), 5);
        assert_eq!(Cell::new(i32::MIN, i32::MIN).neighbors().count(), 3);
    }

    #[test]
    fn ordering_is_row_major() {
        let mut cells = vec![Cell::new(2, 3), Cell::new(1, 1), Cell::new(0, 3)];
        cells.sort();
        assert_eq!(
            cells,
            vec![Cell::new(1, 1), Cell::new(0, 3), Cell::new(2, 3)]
        );
    }
}
