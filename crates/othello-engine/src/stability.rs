//! Conservative stable-piece analysis.
//!
//! A piece is *stable* when no sequence of future moves can flip it. Exact
//! stability is combinatorial, so this module computes a conservative
//! under-approximation that is cheap even at 100x100: it may miss stable
//! pieces, but it never marks a flippable piece as stable.
//!
//! A piece is marked stable when, for each of the four flip axes
//! (horizontal, vertical, both diagonals), one of the following holds:
//! - the piece's full line along that axis has no empty cell (no future
//!   placement can start a flip in that line), or
//! - in at least one direction of the axis the piece touches the board
//!   edge or an already-stable piece of its own color (the run containing
//!   the piece can never be flanked from that side without also flipping
//!   the stable anchor).
//!
//! The rule is applied to a fixpoint, starting from the corners.

use crate::Board;
use othello_core::{Color, Coord};
use std::collections::HashSet;

/// The four flip axes; each axis is checked in both of its directions.
const AXES: [(i8, i8); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Index of the axis line through `coord`, used to look up line fullness.
/// Lines are keyed per axis: row, column, or diagonal offset.
fn line_key(coord: Coord, axis: (i8, i8), size: u8) -> usize {
    match axis {
        (0, 1) => coord.row as usize,
        (1, 0) => coord.col as usize,
        // main diagonal: constant row - col, shifted to be non-negative
        (1, 1) => (coord.row as isize - coord.col as isize + size as isize - 1) as usize,
        // anti-diagonal: constant row + col
        _ => coord.row as usize + coord.col as usize,
    }
}

/// Precomputes, for one axis, which of its lines contain no empty cell.
fn full_lines(board: &Board, axis: (i8, i8)) -> Vec<bool> {
    let size = board.size() as usize;
    let line_count = match axis {
        (0, 1) | (1, 0) => size,
        _ => 2 * size - 1,
    };
    let mut full = vec![true; line_count];
    for coord in board.coords() {
        if board.get(coord).is_none() {
            full[line_key(coord, axis, board.size())] = false;
        }
    }
    full
}

/// Computes the set of cells whose pieces can no longer be flipped.
pub fn stable_pieces(board: &Board) -> HashSet<Coord> {
    let size = board.size();
    let fullness: Vec<Vec<bool>> = AXES.iter().map(|&axis| full_lines(board, axis)).collect();
    let mut stable: HashSet<Coord> = HashSet::new();

    let anchored = |stable: &HashSet<Coord>, coord: Coord, color: Color, dir: (i8, i8)| -> bool {
        match coord.step(dir.0, dir.1, size) {
            None => true, // board edge
            Some(next) => board.get(next) == Some(color) && stable.contains(&next),
        }
    };

    loop {
        let mut changed = false;

        for coord in board.coords() {
            let Some(color) = board.get(coord) else {
                continue;
            };
            if stable.contains(&coord) {
                continue;
            }

            let is_stable = AXES.iter().enumerate().all(|(i, &axis)| {
                fullness[i][line_key(coord, axis, size)]
                    || anchored(&stable, coord, color, axis)
                    || anchored(&stable, coord, color, (-axis.0, -axis.1))
            });

            if is_stable {
                stable.insert(coord);
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    stable
}
