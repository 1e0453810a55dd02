//! Built-in starting patterns.

use clap::ValueEnum;
use service_abi::Cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Period-4 spaceship moving one cell diagonally.
    Glider,
    /// Period-2 oscillator.
    Blinker,
    /// 2x2 still life.
    Block,
    /// Methuselah that settles after 1103 generations.
    RPentomino,
    /// Methuselah that settles after 5206 generations.
    Acorn,
}

impl Pattern {
    pub fn cells(self) -> Vec<Cell> {
        let raw: &[(i32, i32)] = match self {
            Pattern::Glider => &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
            Pattern::Blinker => &[(0, 1), (1, 1), (2, 1)],
            Pattern::Block => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Pattern::RPentomino => &[(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)],
            Pattern::Acorn => &[(1, 0), (3, 1), (0, 2), (1, 2), (4, 2), (5, 2), (6, 2)],
        };
        raw.iter().copied().map(Cell::from).collect()
    }
}
