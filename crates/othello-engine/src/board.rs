//! Board representation with center seeding.

use othello_core::{Color, Coord};
use thiserror::Error;

/// Error constructing a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The requested size is outside [4, 100] or odd.
    #[error("board size must be an even number between 4 and 100, got {0}")]
    InvalidSize(u8),
}

/// An N x N Othello board.
///
/// Cells hold `Option<Color>`; `None` is an empty cell. A fresh board has
/// the standard four-piece center seeding scaled to the configured size:
/// with `m = N / 2`, White occupies `(m-1, m-1)` and `(m, m)`, Black
/// occupies `(m-1, m)` and `(m, m-1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u8,
    cells: Vec<Option<Color>>,
}

impl Board {
    /// Smallest playable board.
    pub const MIN_SIZE: u8 = 4;
    /// Largest playable board.
    pub const MAX_SIZE: u8 = 100;

    /// Creates a seeded board of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidSize`] unless `size` is even and within
    /// `[4, 100]`.
    pub fn new(size: u8) -> Result<Self, BoardError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) || size % 2 != 0 {
            return Err(BoardError::InvalidSize(size));
        }

        let mut board = Board {
            size,
            cells: vec![None; size as usize * size as usize],
        };

        let m = size / 2;
        board.set(Coord::new(m - 1, m - 1), Color::White);
        board.set(Coord::new(m, m), Color::White);
        board.set(Coord::new(m - 1, m), Color::Black);
        board.set(Coord::new(m, m - 1), Color::Black);

        Ok(board)
    }

    /// The board dimension N.
    #[inline]
    pub fn size(&self) -> u8 {
        self.size
    }

    #[inline]
    fn index(&self, coord: Coord) -> usize {
        coord.row as usize * self.size as usize + coord.col as usize
    }

    /// Returns true if the coordinate lies on this board.
    #[inline]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.size && coord.col < self.size
    }

    /// Returns the piece at `coord`, or `None` for an empty or off-board cell.
    #[inline]
    pub fn get(&self, coord: Coord) -> Option<Color> {
        if self.contains(coord) {
            self.cells[self.index(coord)]
        } else {
            None
        }
    }

    /// Places a piece, overwriting whatever the cell held.
    ///
    /// Off-board coordinates are ignored. Rule enforcement lives in
    /// [`apply_move`](crate::apply_move); this is the raw cell write used by
    /// move application and by tests building synthetic positions.
    #[inline]
    pub fn set(&mut self, coord: Coord, color: Color) {
        if self.contains(coord) {
            let idx = self.index(coord);
            self.cells[idx] = Some(color);
        }
    }

    /// Empties a cell. Off-board coordinates are ignored.
    ///
    /// Pieces never leave the board in a real game; this exists for
    /// building synthetic positions.
    #[inline]
    pub fn clear(&mut self, coord: Coord) {
        if self.contains(coord) {
            let idx = self.index(coord);
            self.cells[idx] = None;
        }
    }

    /// Iterates over every coordinate of the board in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| Coord::new(row, col)))
    }

    /// Counts pieces as `(black, white)`.
    pub fn counts(&self) -> (usize, usize) {
        let mut black = 0;
        let mut white = 0;
        for cell in &self.cells {
            match cell {
                Some(Color::Black) => black += 1,
                Some(Color::White) => white += 1,
                None => {}
            }
        }
        (black, white)
    }

    /// Returns true if no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    /// Renders the board as the numeric grid used on the wire:
    /// -1 empty, 0 black, 1 white.
    pub fn to_grid(&self) -> Vec<Vec<i8>> {
        (0..self.size)
            .map(|row| {
                (0..self.size)
                    .map(|col| match self.get(Coord::new(row, col)) {
                        None => -1,
                        Some(color) => color.index() as i8,
                    })
                    .collect()
            })
            .collect()
    }
}
