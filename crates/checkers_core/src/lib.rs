// Core checkers game logic modules
pub mod board;
pub mod error;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod position;

// Re-export main types for convenience
pub use board::{Board, GameOutcome};
pub use error::CheckersError;
pub use movegen::legal_moves;
pub use moves::Move;
pub use piece::{Color, Piece};
pub use position::Square;
