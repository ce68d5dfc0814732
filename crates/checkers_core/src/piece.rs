use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Row step a man of this color is allowed to make. Black starts on
    /// rows 0-2 and moves down the board, white starts on rows 5-7 and moves up.
    pub fn forward(self) -> i8 {
        match self {
            Color::Black => 1,
            Color::White => -1,
        }
    }

    /// Row on which a man of this color is crowned.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::Black => 7,
            Color::White => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => f.write_str("black"),
            Color::White => f.write_str("white"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub is_king: bool,
}

impl Piece {
    pub fn man(color: Color) -> Self {
        Self { color, is_king: false }
    }

    pub fn king(color: Color) -> Self {
        Self { color, is_king: true }
    }

    // Crowning never reverts, so a king stays a king.
    pub(crate) fn crowned(self) -> Self {
        Self { is_king: true, ..self }
    }

    pub fn glyph(self) -> char {
        match (self.color, self.is_king) {
            (Color::Black, false) => 'b',
            (Color::Black, true) => 'B',
            (Color::White, false) => 'w',
            (Color::White, true) => 'W',
        }
    }

    /// Parses one board cell: `Some(None)` is an empty square and `None`
    /// an unknown glyph.
    pub(crate) fn from_glyph(glyph: char) -> Option<Option<Self>> {
        match glyph {
            '.' => Some(None),
            'b' => Some(Some(Piece::man(Color::Black))),
            'B' => Some(Some(Piece::king(Color::Black))),
            'w' => Some(Some(Piece::man(Color::White))),
            'W' => Some(Some(Piece::king(Color::White))),
            _ => None,
        }
    }
}
