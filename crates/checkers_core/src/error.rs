use thiserror::Error;

use crate::{Color, Move};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckersError {
    #[error("illegal move {mv} for {color}")]
    IllegalMove { mv: Move, color: Color },

    #[error("{color} has no legal moves")]
    NoMovesAvailable { color: Color },

    #[error("malformed board: {0}")]
    MalformedBoard(String),
}
