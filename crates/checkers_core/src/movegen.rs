use crate::moves::DIAGONALS;
use crate::{Board, Color, Move, Square};

/// Every legal move for `color`. Captures are forced: when any jump exists
/// only jumps are returned. Squares are scanned row by row and directions in
/// a fixed order, so the list is deterministic for a given board.
pub fn legal_moves(board: &Board, color: Color) -> Vec<Move> {
    let jumps = collect(board, color, 2);
    if !jumps.is_empty() {
        return jumps;
    }
    collect(board, color, 1)
}

/// Jumps only, regardless of whether simple moves exist.
pub fn jump_moves(board: &Board, color: Color) -> Vec<Move> {
    collect(board, color, 2)
}

pub fn has_legal_move(board: &Board, color: Color) -> bool {
    !legal_moves(board, color).is_empty()
}

fn collect(board: &Board, color: Color, distance: i8) -> Vec<Move> {
    let mut moves = Vec::new();
    for (from, _) in board.pieces().filter(|(_, piece)| piece.color == color) {
        for (dr, dc) in DIAGONALS {
            if let Some(mv) = candidate(from, dr * distance, dc * distance) {
                if mv.is_valid(board) {
                    moves.push(mv);
                }
            }
        }
    }
    moves
}

fn candidate(from: Square, dr: i8, dc: i8) -> Option<Move> {
    from.offset(dr, dc).map(|to| Move::new(from, to))
}
