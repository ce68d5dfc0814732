use std::fmt;

use crate::{Board, Color, Square};

/// The four diagonal directions, in the order moves are generated.
pub(crate) const DIAGONALS: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// A single step or a single two-square jump. Not tied to any board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }

    pub fn from_coords(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Option<Self> {
        Some(Self {
            from: Square::new(from_row, from_col)?,
            to: Square::new(to_row, to_col)?,
        })
    }

    pub fn is_jump(&self) -> bool {
        self.from.row.abs_diff(self.to.row) == 2
    }

    /// The midpoint square a jump hops over.
    pub fn captured_square(&self) -> Option<Square> {
        if !self.is_jump() {
            return None;
        }
        Square::new(
            (self.from.row + self.to.row) / 2,
            (self.from.col + self.to.col) / 2,
        )
    }

    /// Checks the move against the piece standing on `from`, ignoring the
    /// forced-capture rule (that is a property of the whole move list).
    pub fn is_valid(&self, board: &Board) -> bool {
        if self.is_jump() {
            self.is_valid_jump(board)
        } else {
            self.is_valid_step(board)
        }
    }

    fn direction(&self) -> Option<(i8, i8)> {
        let dr = self.to.row as i8 - self.from.row as i8;
        let dc = self.to.col as i8 - self.from.col as i8;
        if dr.abs() != dc.abs() || dr == 0 {
            return None;
        }
        Some((dr.signum(), dc.signum()))
    }

    fn is_valid_step(&self, board: &Board) -> bool {
        let piece = match board.get(self.from) {
            Some(p) => p,
            None => return false,
        };
        if self.from.row.abs_diff(self.to.row) != 1 || self.direction().is_none() {
            return false;
        }
        if board.get(self.to).is_some() {
            return false;
        }
        piece.is_king || self.advances(piece.color)
    }

    fn is_valid_jump(&self, board: &Board) -> bool {
        let piece = match board.get(self.from) {
            Some(p) => p,
            None => return false,
        };
        if self.direction().is_none() || board.get(self.to).is_some() {
            return false;
        }
        // Men only capture forwards.
        if !piece.is_king && !self.advances(piece.color) {
            return false;
        }
        match self.captured_square().and_then(|sq| board.get(sq)) {
            Some(victim) => victim.color != piece.color,
            None => false,
        }
    }

    fn advances(&self, color: Color) -> bool {
        (self.to.row as i8 - self.from.row as i8).signum() == color.forward()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}
