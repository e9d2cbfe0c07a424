//! Full game state with turn passing.
//!
//! [`Game`] owns a board and the side to move, and layers Othello's turn
//! rules on top of the pure move functions: after every move the turn
//! passes silently when the next side has no legal reply, and the game
//! ends (scored by piece count) when neither side can move or the board
//! is full. A seat can also forfeit, which ends the game immediately -
//! that is how bot faults are scored.

use crate::{
    apply_move, is_terminal, legal_moves, outcome, stable_pieces, Board, BoardError,
    IllegalMoveError,
};
use othello_core::{Color, Coord, Outcome};
use std::collections::HashSet;
use thiserror::Error;

/// Error type for game operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    /// The move is not legal in the current position.
    #[error(transparent)]
    IllegalMove(#[from] IllegalMoveError),
    /// The game has already ended.
    #[error("game has already ended")]
    GameAlreadyOver,
}

/// A complete Othello game.
///
/// Unlike the free functions in this crate, `Game` tracks whose turn it
/// is, whether a turn was just skipped, what the last move flipped, and
/// the final outcome.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    side_to_move: Color,
    result: Option<Outcome>,
    last_move: Option<Coord>,
    last_flipped: Vec<Coord>,
    skipped: Option<Color>,
}

impl Game {
    /// Creates a new game on a seeded board. Black moves first.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidSize`] for sizes outside [4, 100] or odd.
    pub fn new(size: u8) -> Result<Self, BoardError> {
        Ok(Self::from_board(Board::new(size)?, Color::Black))
    }

    /// Creates a game from a custom position.
    ///
    /// The position is normalized the same way a played move would leave
    /// it: if the game is already decided the result is recorded, and if
    /// `side_to_move` has no legal reply the turn passes immediately.
    pub fn from_board(board: Board, side_to_move: Color) -> Self {
        let mut game = Game {
            board,
            side_to_move,
            result: None,
            last_move: None,
            last_flipped: Vec::new(),
            skipped: None,
        };

        if is_terminal(&game.board) {
            game.result = Some(outcome(&game.board));
        } else if legal_moves(&game.board, game.side_to_move).is_empty() {
            game.skipped = Some(game.side_to_move);
            game.side_to_move = game.side_to_move.opposite();
        }
        game
    }

    /// Returns a reference to the current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The side whose turn it is. Meaningless once the game is over.
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// All legal moves for the side to move; empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Coord> {
        if self.result.is_some() {
            Vec::new()
        } else {
            legal_moves(&self.board, self.side_to_move)
        }
    }

    /// Returns the outcome if the game has ended.
    pub fn result(&self) -> Option<Outcome> {
        self.result
    }

    /// Returns true if the game has ended.
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    /// The most recent placement.
    pub fn last_move(&self) -> Option<Coord> {
        self.last_move
    }

    /// Cells flipped by the most recent placement.
    pub fn last_flipped(&self) -> &[Coord] {
        &self.last_flipped
    }

    /// The side whose turn was passed during the last advance, if any.
    pub fn skipped_turn(&self) -> Option<Color> {
        self.skipped
    }

    /// Piece counts as `(black, white)`.
    pub fn counts(&self) -> (usize, usize) {
        self.board.counts()
    }

    /// Conservatively computed unflippable pieces, for display.
    pub fn stable_pieces(&self) -> HashSet<Coord> {
        stable_pieces(&self.board)
    }

    /// Plays a move for the side to move and advances the turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameAlreadyOver`] after the game has ended and
    /// [`GameError::IllegalMove`] for placements that flip nothing; the
    /// position is unchanged in both cases.
    pub fn make_move(&mut self, mov: Coord) -> Result<(), GameError> {
        if self.result.is_some() {
            return Err(GameError::GameAlreadyOver);
        }

        let (board, flipped) = apply_move(&self.board, self.side_to_move, mov)?;
        self.board = board;
        self.last_move = Some(mov);
        self.last_flipped = flipped;
        self.skipped = None;
        self.advance_turn();
        Ok(())
    }

    /// Ends the game immediately with `loser` forfeiting.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameAlreadyOver`] if a result is already set.
    pub fn forfeit(&mut self, loser: Color) -> Result<(), GameError> {
        if self.result.is_some() {
            return Err(GameError::GameAlreadyOver);
        }
        self.result = Some(Outcome::win_for(loser.opposite()));
        Ok(())
    }

    /// Hands the turn to the opponent, skipping it back when they cannot
    /// reply, and records the result when neither side can move.
    fn advance_turn(&mut self) {
        if is_terminal(&self.board) {
            self.result = Some(outcome(&self.board));
            return;
        }

        let next = self.side_to_move.opposite();
        if legal_moves(&self.board, next).is_empty() {
            // not terminal, so the mover necessarily still has a reply
            self.skipped = Some(next);
        } else {
            self.side_to_move = next;
        }
    }
}
