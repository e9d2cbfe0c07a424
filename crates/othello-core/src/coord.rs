//! Board coordinate representation.
//!
//! Boards are not fixed at 8x8 here - this service plays anything from
//! 4x4 to 100x100. Coordinates therefore carry no implicit board size;
//! bounds are checked against the owning board.

use std::fmt;

/// A (row, column) cell address. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    /// Creates a coordinate.
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Coord { row, col }
    }

    /// Steps one cell in direction `(dr, dc)`, returning `None` when the
    /// step would leave an `size` x `size` board.
    #[inline]
    pub fn step(self, dr: i8, dc: i8, size: u8) -> Option<Coord> {
        let row = self.row as i16 + dr as i16;
        let col = self.col as i16 + dc as i16;
        if row < 0 || col < 0 || row >= size as i16 || col >= size as i16 {
            None
        } else {
            Some(Coord::new(row as u8, col as u8))
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
