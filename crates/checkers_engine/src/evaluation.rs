use std::sync::Mutex;

use checkers_core::{Board, Color};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Material, measured so that one man is 100
const MAN_VALUE: i32 = 100;
const KING_VALUE: i32 = 175;
// Kings on the side columns are easily trapped
const EDGE_KING_PENALTY: i32 = 25;

/// Scores a position. Implementations must be zero-sum:
/// `evaluate(b, Black) == -evaluate(b, White)`.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, board: &Board, perspective: Color) -> i32;
}

/// The deterministic heuristic used by every search comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEvaluator;

impl Evaluator for StaticEvaluator {
    fn evaluate(&self, board: &Board, perspective: Color) -> i32 {
        evaluate(board, perspective)
    }
}

/// Evaluates a position from `perspective`'s side. Each term is computed as
/// white total minus black total and the sum is negated for black.
pub fn evaluate(board: &Board, perspective: Color) -> i32 {
    let white_minus_black = material(board) + advancement(board) + edge_kings(board);
    match perspective {
        Color::White => white_minus_black,
        Color::Black => -white_minus_black,
    }
}

fn signed(color: Color, value: i32) -> i32 {
    match color {
        Color::White => value,
        Color::Black => -value,
    }
}

fn material(board: &Board) -> i32 {
    board
        .pieces()
        .map(|(_, piece)| signed(piece.color, if piece.is_king { KING_VALUE } else { MAN_VALUE }))
        .sum()
}

/// Men earn the square of the rows they have advanced from their own side.
fn advancement(board: &Board) -> i32 {
    board
        .pieces()
        .filter(|(_, piece)| !piece.is_king)
        .map(|(square, piece)| {
            let advanced = match piece.color {
                Color::Black => i32::from(square.row),
                Color::White => 7 - i32::from(square.row),
            };
            signed(piece.color, advanced * advanced)
        })
        .sum()
}

fn edge_kings(board: &Board) -> i32 {
    board
        .pieces()
        .filter(|(square, piece)| piece.is_king && square.is_edge_column())
        .map(|(_, piece)| signed(piece.color, -EDGE_KING_PENALTY))
        .sum()
}

/// Evaluation settings. Noise is off unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalConfig {
    /// Relative amplitude of a random multiplier applied to every score,
    /// e.g. `0.03` for +/-3%.
    pub noise: Option<f64>,
}

impl EvalConfig {
    pub fn build(&self, seed: Option<u64>) -> Box<dyn Evaluator> {
        match self.noise {
            Some(amplitude) if amplitude > 0.0 => Box::new(NoisyEvaluator::new(amplitude, seed)),
            _ => Box::new(StaticEvaluator),
        }
    }
}

/// Wraps the static heuristic with a per-call multiplicative jitter so that
/// otherwise identical games diverge. Not zero-sum across calls.
pub struct NoisyEvaluator {
    amplitude: f64,
    rng: Mutex<StdRng>,
}

impl NoisyEvaluator {
    pub fn new(amplitude: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            amplitude: amplitude.abs(),
            rng: Mutex::new(rng),
        }
    }
}

impl Evaluator for NoisyEvaluator {
    fn evaluate(&self, board: &Board, perspective: Color) -> i32 {
        let score = evaluate(board, perspective);
        let factor = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(1.0 - self.amplitude..=1.0 + self.amplitude),
            Err(_) => 1.0,
        };
        (f64::from(score) * factor).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkers_core::{Piece, Square};

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col).unwrap()
    }

    #[test]
    fn starting_position_is_balanced() {
        let board = Board::new();
        assert_eq!(evaluate(&board, Color::Black), 0);
        assert_eq!(evaluate(&board, Color::White), 0);
    }

    #[test]
    fn material_favours_the_side_with_more_pieces() {
        let board = Board::with_pieces(&[
            (sq(7, 2), Piece::man(Color::White)),
            (sq(0, 1), Piece::man(Color::Black)),
            (sq(0, 3), Piece::man(Color::Black)),
        ]);
        // Men on their home rows earn no advancement.
        assert_eq!(evaluate(&board, Color::Black), 100);
        assert_eq!(evaluate(&board, Color::White), -100);
    }

    #[test]
    fn advancement_grows_quadratically() {
        let board = Board::with_pieces(&[(sq(3, 2), Piece::man(Color::Black))]);
        assert_eq!(evaluate(&board, Color::Black), MAN_VALUE + 9);
        let board = Board::with_pieces(&[(sq(2, 1), Piece::man(Color::White))]);
        assert_eq!(evaluate(&board, Color::White), MAN_VALUE + 25);
    }

    #[test]
    fn kings_on_the_edge_are_penalised() {
        let centre = Board::with_pieces(&[(sq(3, 2), Piece::king(Color::White))]);
        let edge = Board::with_pieces(&[(sq(3, 0), Piece::king(Color::White))]);
        assert_eq!(evaluate(&centre, Color::White), KING_VALUE);
        assert_eq!(evaluate(&edge, Color::White), KING_VALUE - EDGE_KING_PENALTY);
    }

    #[test]
    fn noise_is_opt_in() {
        let board = Board::with_pieces(&[(sq(3, 2), Piece::king(Color::White))]);
        let plain = EvalConfig::default().build(None);
        assert_eq!(plain.evaluate(&board, Color::White), KING_VALUE);

        let noisy = EvalConfig { noise: Some(0.03) }.build(Some(1));
        for _ in 0..50 {
            let score = noisy.evaluate(&board, Color::White);
            assert!((169..=181).contains(&score), "score {score} out of range");
        }
    }
}
