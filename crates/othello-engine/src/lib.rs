//! Othello rules engine.
//!
//! This crate provides:
//! - [`Board`] - a dynamically sized board (4x4 to 100x100) with center seeding
//! - Move generation and application ([`legal_moves`], [`apply_move`])
//! - Terminal-state detection and scoring ([`is_terminal`], [`outcome`])
//! - Conservative stable-piece analysis ([`stable_pieces`])
//! - [`Game`] - full game state with turn passing and forfeit handling
//!
//! The move functions are pure: [`apply_move`] returns a new board plus the
//! flipped cells and never mutates its input. [`Game`] layers turn order,
//! silent passes, and game-over bookkeeping on top.
//!
//! # Example
//!
//! ```
//! use othello_core::{Color, Coord};
//! use othello_engine::Game;
//!
//! let mut game = Game::new(8).unwrap();
//! assert_eq!(game.side_to_move(), Color::Black);
//! assert_eq!(game.legal_moves().len(), 4);
//! game.make_move(Coord::new(2, 3)).unwrap();
//! assert_eq!(game.counts(), (4, 1));
//! ```

mod board;
mod game;
mod rules;
mod stability;

pub use board::{Board, BoardError};
pub use game::{Game, GameError};
pub use rules::{apply_move, is_legal_move, is_terminal, legal_moves, outcome, IllegalMoveError, DIRECTIONS};
pub use stability::stable_pieces;
