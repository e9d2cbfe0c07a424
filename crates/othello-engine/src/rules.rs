//! Legal-move enumeration, move application, and terminal detection.
//!
//! All functions here are pure: they read a [`Board`] and return new data.
//! Scanning is the straightforward per-direction walk; it holds for any
//! board size in range with no 8x8 shortcuts.

use crate::Board;
use othello_core::{Color, Coord, Outcome};
use thiserror::Error;

/// The eight scan directions: N, NE, E, SE, S, SW, W, NW.
pub const DIRECTIONS: [(i8, i8); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// A move that violates the flanking rule (or targets a non-empty cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal move {mov} for {color}")]
pub struct IllegalMoveError {
    /// The attempted placement.
    pub mov: Coord,
    /// The side that attempted it.
    pub color: Color,
}

/// Walks outward from `from` (exclusive) in one direction and reports
/// whether the walk first crosses one or more `color.opposite()` pieces
/// and then lands on a `color` piece.
fn flips_in_direction(board: &Board, color: Color, from: Coord, dir: (i8, i8)) -> bool {
    let mut cursor = from;
    let mut crossed_opponent = false;

    while let Some(next) = cursor.step(dir.0, dir.1, board.size()) {
        match board.get(next) {
            None => return false,
            Some(c) if c == color => return crossed_opponent,
            Some(_) => crossed_opponent = true,
        }
        cursor = next;
    }

    false
}

/// Returns true if placing `color` at `mov` is legal: the cell is empty
/// and at least one direction flips.
pub fn is_legal_move(board: &Board, color: Color, mov: Coord) -> bool {
    if !board.contains(mov) || board.get(mov).is_some() {
        return false;
    }
    DIRECTIONS
        .iter()
        .any(|&dir| flips_in_direction(board, color, mov, dir))
}

/// Enumerates every legal move for `color`, in row-major order.
pub fn legal_moves(board: &Board, color: Color) -> Vec<Coord> {
    board
        .coords()
        .filter(|&coord| board.get(coord).is_none() && is_legal_move(board, color, coord))
        .collect()
}

/// Applies a move, returning the new board and the cells that flipped.
///
/// The flipped set never includes the placed cell and is never empty for
/// a legal move.
///
/// # Errors
///
/// Returns [`IllegalMoveError`] without touching the board if the move is
/// not in `legal_moves(board, color)`.
pub fn apply_move(
    board: &Board,
    color: Color,
    mov: Coord,
) -> Result<(Board, Vec<Coord>), IllegalMoveError> {
    if !is_legal_move(board, color, mov) {
        return Err(IllegalMoveError { mov, color });
    }

    let mut next = board.clone();
    next.set(mov, color);

    let mut flipped = Vec::new();
    for &dir in &DIRECTIONS {
        if !flips_in_direction(board, color, mov, dir) {
            continue;
        }
        let mut cursor = mov;
        while let Some(cell) = cursor.step(dir.0, dir.1, board.size()) {
            if board.get(cell) == Some(color) {
                break;
            }
            next.set(cell, color);
            flipped.push(cell);
            cursor = cell;
        }
    }

    Ok((next, flipped))
}

/// Returns true when neither side has a legal move. A full board is a
/// special case of this.
pub fn is_terminal(board: &Board) -> bool {
    legal_moves(board, Color::Black).is_empty() && legal_moves(board, Color::White).is_empty()
}

/// Scores a finished board by piece count.
pub fn outcome(board: &Board) -> Outcome {
    let (black, white) = board.counts();
    match black.cmp(&white) {
        std::cmp::Ordering::Greater => Outcome::BlackWins,
        std::cmp::Ordering::Less => Outcome::WhiteWins,
        std::cmp::Ordering::Equal => Outcome::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_moves_scale_with_board_size() {
        for size in (4u8..=100).step_by(2) {
            let board = Board::new(size).unwrap();
            let m = size / 2;
            let mut expected = vec![
                Coord::new(m - 2, m - 1),
                Coord::new(m - 1, m - 2),
                Coord::new(m, m + 1),
                Coord::new(m + 1, m),
            ];
            expected.sort();
            assert_eq!(legal_moves(&board, Color::Black), expected, "size {}", size);
        }
    }

    #[test]
    fn legal_moves_is_deterministic() {
        let board = Board::new(8).unwrap();
        assert_eq!(
            legal_moves(&board, Color::Black),
            legal_moves(&board, Color::Black)
        );
        assert_eq!(
            legal_moves(&board, Color::White),
            legal_moves(&board, Color::White)
        );
    }

    #[test]
    fn apply_move_flips_the_crossed_run() {
        let board = Board::new(8).unwrap();
        let (next, flipped) = apply_move(&board, Color::Black, Coord::new(2, 3)).unwrap();

        assert_eq!(flipped, vec![Coord::new(3, 3)]);
        assert_eq!(next.get(Coord::new(2, 3)), Some(Color::Black));
        assert_eq!(next.get(Coord::new(3, 3)), Some(Color::Black));
        assert_eq!(next.counts(), (4, 1));
        // input board untouched
        assert_eq!(board.counts(), (2, 2));
    }

    #[test]
    fn apply_move_rejects_occupied_cell() {
        let board = Board::new(8).unwrap();
        let err = apply_move(&board, Color::Black, Coord::new(3, 3)).unwrap_err();
        assert_eq!(
            err,
            IllegalMoveError {
                mov: Coord::new(3, 3),
                color: Color::Black
            }
        );
    }

    #[test]
    fn apply_move_rejects_non_flipping_cell() {
        let board = Board::new(8).unwrap();
        assert!(apply_move(&board, Color::Black, Coord::new(0, 0)).is_err());
    }

    #[test]
    fn apply_move_flips_multiple_directions() {
        // Black at (2,2) flanks white runs both east and south-east.
        let mut board = Board::new(8).unwrap();
        board.set(Coord::new(2, 3), Color::White);
        board.set(Coord::new(2, 4), Color::Black);
        board.set(Coord::new(4, 4), Color::Black); // diagonal anchor behind White (3,3)

        let (next, mut flipped) = apply_move(&board, Color::Black, Coord::new(2, 2)).unwrap();
        flipped.sort();
        assert_eq!(flipped, vec![Coord::new(2, 3), Coord::new(3, 3)]);
        assert_eq!(next.get(Coord::new(2, 3)), Some(Color::Black));
        assert_eq!(next.get(Coord::new(3, 3)), Some(Color::Black));
    }

    #[test]
    fn every_legal_move_flips_at_least_one_piece() {
        let board = Board::new(8).unwrap();
        for mov in legal_moves(&board, Color::Black) {
            let (_, flipped) = apply_move(&board, Color::Black, mov).unwrap();
            assert!(!flipped.is_empty(), "move {} flipped nothing", mov);
        }
    }

    #[test]
    fn fresh_board_is_not_terminal() {
        let board = Board::new(8).unwrap();
        assert!(!is_terminal(&board));
    }

    #[test]
    fn board_with_no_moves_for_either_side_is_terminal() {
        // Only black pieces on the board: nobody can flip anything.
        let mut board = Board::new(4).unwrap();
        board.set(Coord::new(1, 1), Color::Black);
        board.set(Coord::new(2, 2), Color::Black);
        assert!(is_terminal(&board));
        assert_eq!(outcome(&board), Outcome::BlackWins);
    }

    #[test]
    fn outcome_by_piece_count() {
        let mut board = Board::new(4).unwrap();
        assert_eq!(outcome(&board), Outcome::Draw);
        board.set(Coord::new(0, 0), Color::White);
        assert_eq!(outcome(&board), Outcome::WhiteWins);
        board.set(Coord::new(0, 1), Color::Black);
        board.set(Coord::new(0, 2), Color::Black);
        assert_eq!(outcome(&board), Outcome::BlackWins);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Random playouts on random board sizes: every applied move
            /// flips at least one piece, adds exactly one piece, and only
            /// recolors cells the opponent held.
            #[test]
            fn playouts_obey_flip_invariants(
                half in 2u8..=6,
                picks in proptest::collection::vec(0usize..128, 0..80),
            ) {
                let size = half * 2;
                let mut board = Board::new(size).unwrap();
                let mut side = Color::Black;

                for pick in picks {
                    if is_terminal(&board) {
                        break;
                    }
                    let moves = legal_moves(&board, side);
                    if moves.is_empty() {
                        side = side.opposite();
                        continue;
                    }

                    let mov = moves[pick % moves.len()];
                    let before = board.counts();
                    let (next, flipped) = apply_move(&board, side, mov).unwrap();

                    prop_assert!(!flipped.is_empty());
                    let after = next.counts();
                    prop_assert_eq!(after.0 + after.1, before.0 + before.1 + 1);
                    for cell in &flipped {
                        prop_assert_eq!(next.get(*cell), Some(side));
                        prop_assert!(board.get(*cell).is_some());
                        prop_assert_ne!(board.get(*cell), Some(side));
                    }

                    board = next;
                    side = side.opposite();
                }
            }
        }
    }
}
