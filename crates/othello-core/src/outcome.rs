//! Result of a finished game.

use crate::Color;

/// The outcome of a completed Othello game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Black finished with strictly more pieces, or White forfeited.
    BlackWins,
    /// White finished with strictly more pieces, or Black forfeited.
    WhiteWins,
    /// Both sides finished with the same piece count.
    Draw,
}

impl Outcome {
    /// Returns the winning color, or `None` for a draw.
    #[inline]
    pub const fn winner(self) -> Option<Color> {
        match self {
            Outcome::BlackWins => Some(Color::Black),
            Outcome::WhiteWins => Some(Color::White),
            Outcome::Draw => None,
        }
    }

    /// The outcome in which `color` wins.
    #[inline]
    pub const fn win_for(color: Color) -> Self {
        match color {
            Color::Black => Outcome::BlackWins,
            Color::White => Outcome::WhiteWins,
        }
    }
}
