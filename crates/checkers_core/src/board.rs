use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::movegen::{has_legal_move, legal_moves};
use crate::position::BOARD_SIZE;
use crate::{CheckersError, Color, Move, Piece, Square};

const SIZE: usize = BOARD_SIZE as usize;

/// How a game ended, as reported to whoever keeps score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    BlackWins,
    WhiteWins,
    Draw,
    /// The side to move still has pieces but cannot move any of them.
    NoMove(Color),
}

impl GameOutcome {
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::Black => GameOutcome::BlackWins,
            Color::White => GameOutcome::WhiteWins,
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::BlackWins => f.write_str("black wins"),
            GameOutcome::WhiteWins => f.write_str("white wins"),
            GameOutcome::Draw => f.write_str("draw"),
            GameOutcome::NoMove(color) => write!(f, "{color} cannot move"),
        }
    }
}

/// An 8x8 checkers position. The board is a small `Copy` value: every search
/// branch works on its own copy and the caller's board is never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Piece>; SIZE]; SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The standard starting position: black men on the dark squares of
    /// rows 0-2, white men on rows 5-7.
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.setup_initial_position();
        board
    }

    pub fn empty() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
        }
    }

    fn setup_initial_position(&mut self) {
        for square in Square::all().filter(|sq| sq.is_dark()) {
            match square.row {
                0..=2 => self.place(square, Piece::man(Color::Black)),
                5..=7 => self.place(square, Piece::man(Color::White)),
                _ => {}
            }
        }
    }

    pub fn with_pieces(pieces: &[(Square, Piece)]) -> Self {
        let mut board = Self::empty();
        for &(square, piece) in pieces {
            board.place(square, piece);
        }
        board
    }

    /// Parses eight rows of eight glyphs: `.` empty, `b`/`B` black man/king,
    /// `w`/`W` white man/king. Row 0 comes first.
    pub fn from_rows(rows: &[&str]) -> Result<Self, CheckersError> {
        if rows.len() != SIZE {
            return Err(CheckersError::MalformedBoard(format!(
                "expected {SIZE} rows, found {}",
                rows.len()
            )));
        }
        let mut board = Self::empty();
        for (row, line) in rows.iter().enumerate() {
            let glyphs: Vec<char> = line.trim().chars().collect();
            if glyphs.len() != SIZE {
                return Err(CheckersError::MalformedBoard(format!(
                    "row {row} has {} cells, expected {SIZE}",
                    glyphs.len()
                )));
            }
            for (col, glyph) in glyphs.into_iter().enumerate() {
                let piece = Piece::from_glyph(glyph).ok_or_else(|| {
                    CheckersError::MalformedBoard(format!(
                        "invalid cell '{glyph}' at {row},{col}"
                    ))
                })?;
                board.cells[row][col] = piece;
            }
        }
        Ok(board)
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        let (row, col) = square.index();
        self.cells[row][col]
    }

    pub fn place(&mut self, square: Square, piece: Piece) {
        let (row, col) = square.index();
        self.cells[row][col] = Some(piece);
    }

    pub fn remove(&mut self, square: Square) -> Option<Piece> {
        let (row, col) = square.index();
        self.cells[row][col].take()
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|piece| (sq, piece)))
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces().filter(|(_, piece)| piece.color == color).count()
    }

    /// True once either side has lost all of its pieces.
    pub fn is_game_over(&self) -> bool {
        self.count(Color::Black) == 0 || self.count(Color::White) == 0
    }

    /// Returns the position after `mv`. The piece is relocated, crowned on
    /// its back rank and, for a jump, the hopped piece is removed. The move
    /// is assumed to come from [`legal_moves`]; use [`Board::play`] for
    /// untrusted input. A move from an empty square leaves the board as is.
    pub fn apply_move(&self, mv: Move) -> Board {
        let mut next = *self;
        let piece = match next.remove(mv.from) {
            Some(piece) => piece,
            None => return next,
        };
        let piece = if mv.to.row == piece.color.back_rank() {
            piece.crowned()
        } else {
            piece
        };
        next.place(mv.to, piece);
        if let Some(captured) = mv.captured_square() {
            next.remove(captured);
        }
        next
    }

    /// Checked move application: rejects anything not in `legal_moves`.
    pub fn play(&self, mv: Move, color: Color) -> Result<Board, CheckersError> {
        if !legal_moves(self, color).contains(&mv) {
            debug!("rejected {mv} for {color}");
            return Err(CheckersError::IllegalMove { mv, color });
        }
        Ok(self.apply_move(mv))
    }

    /// Whether the game is decided with `mover` to play. A side with no
    /// pieces has lost; a side with pieces but no move is reported as
    /// `NoMove` so the caller can decide what that means. Draws by move
    /// limit belong to the caller.
    pub fn outcome(&self, mover: Color) -> Option<GameOutcome> {
        if self.count(Color::White) == 0 {
            return Some(GameOutcome::BlackWins);
        }
        if self.count(Color::Black) == 0 {
            return Some(GameOutcome::WhiteWins);
        }
        if !has_legal_move(self, mover) {
            return Some(GameOutcome::NoMove(mover));
        }
        None
    }
}

impl FromStr for Board {
    type Err = CheckersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::from_rows(&rows)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|cell| cell.map_or('.', Piece::glyph))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
