// Adversarial search over checkers positions: minimax, alpha-beta, negamax
// and negascout. Every call works on board copies and returns its result;
// nothing is shared between calls.
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use checkers_core::{legal_moves, Board, CheckersError, Color, Move};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::evaluation::{Evaluator, StaticEvaluator};

// Search bounds
pub const INFINITY: i32 = 10_000; // Sentinel for alpha/beta windows
pub const WIN_SCORE: i32 = 9_000; // Stuck side loses; kept inside the window
pub const MIN_DEPTH: u8 = 1;
pub const MAX_DEPTH: u8 = 12;

// The wall clock is only read every this many nodes
const CLOCK_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Minimax,
    AlphaBeta,
    Negamax,
    Negascout,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Minimax,
        Algorithm::AlphaBeta,
        Algorithm::Negamax,
        Algorithm::Negascout,
    ];
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Minimax => "minimax",
            Algorithm::AlphaBeta => "alpha-beta",
            Algorithm::Negamax => "negamax",
            Algorithm::Negascout => "negascout",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimax" => Ok(Algorithm::Minimax),
            "alpha-beta" | "alphabeta" | "ab" => Ok(Algorithm::AlphaBeta),
            "negamax" => Ok(Algorithm::Negamax),
            "negascout" | "pvs" => Ok(Algorithm::Negascout),
            other => Err(format!("unknown search algorithm '{other}'")),
        }
    }
}

/// Why the search stopped descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal end: every line was followed to the ply limit or a finished game.
    DepthExhausted,
    /// The deadline or the cancel flag fired; some lines were cut short.
    DeadlineReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchReport {
    pub best_move: Move,
    /// Score of `best_move` from the mover's side.
    pub score: i32,
    pub nodes: u64,
    pub termination: Termination,
}

/// Optional bounds on a search besides its ply depth.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub deadline: Option<Duration>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchLimits {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }
}

// Tracks the deadline and cancellation for one search call
struct TimeManager {
    start_time: Instant,
    allocated_time: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl TimeManager {
    fn new(limits: &SearchLimits) -> Self {
        Self {
            start_time: Instant::now(),
            allocated_time: limits.deadline,
            cancel: limits.cancel.clone(),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn out_of_time(&self) -> bool {
        self.allocated_time
            .is_some_and(|limit| self.start_time.elapsed() >= limit)
    }
}

// Result of a node: its value and, if one was recorded, the move that produced it
#[derive(Debug, Clone, Copy)]
struct Scored {
    score: i32,
    mv: Option<Move>,
}

impl Scored {
    fn leaf(score: i32) -> Self {
        Self { score, mv: None }
    }
}

struct Search<'a, E: Evaluator + ?Sized> {
    evaluator: &'a E,
    turn: Color, // side originally on turn; it maximizes in minimax and alpha-beta
    ply_depth: u8,
    clock: TimeManager,
    nodes: u64,
    interrupted: bool,
}

impl<'a, E: Evaluator + ?Sized> Search<'a, E> {
    fn new(evaluator: &'a E, turn: Color, ply_depth: u8, limits: &SearchLimits) -> Self {
        Self {
            evaluator,
            turn,
            ply_depth,
            clock: TimeManager::new(limits),
            nodes: 0,
            interrupted: false,
        }
    }

    // Counts the node and decides whether it is a leaf. The root is always
    // expanded so a move can be reported.
    fn is_leaf(&mut self, board: &Board, ply: u8) -> bool {
        self.nodes += 1;
        if ply == 0 {
            return false;
        }
        if !self.interrupted
            && (self.clock.cancelled()
                || (self.nodes % CLOCK_CHECK_INTERVAL == 0 && self.clock.out_of_time()))
        {
            self.interrupted = true;
        }
        self.interrupted || ply >= self.ply_depth || board.is_game_over()
    }

    // A side that still has pieces but cannot move loses; sooner is worse.
    fn stalled(&self, mover: Color, perspective: Color, ply: u8) -> i32 {
        let loss = -(WIN_SCORE - i32::from(ply));
        if mover == perspective {
            loss
        } else {
            -loss
        }
    }

    fn minimax(&mut self, board: &Board, mover: Color, ply: u8) -> Scored {
        if self.is_leaf(board, ply) {
            return Scored::leaf(self.evaluator.evaluate(board, self.turn));
        }
        let moves = legal_moves(board, mover);
        if moves.is_empty() {
            return Scored::leaf(self.stalled(mover, self.turn, ply));
        }

        if mover == self.turn {
            let mut best = Scored::leaf(-INFINITY);
            for mv in moves {
                let child = board.apply_move(mv);
                let score = self.minimax(&child, mover.opponent(), ply + 1).score;
                if score > best.score {
                    best = Scored { score, mv: Some(mv) };
                }
            }
            best
        } else {
            let mut best = Scored::leaf(INFINITY);
            for mv in moves {
                let child = board.apply_move(mv);
                let score = self.minimax(&child, mover.opponent(), ply + 1).score;
                if score < best.score {
                    best = Scored { score, mv: Some(mv) };
                }
            }
            best
        }
    }

    // Fail-hard: a max node never returns less than alpha, a min node never
    // more than beta.
    fn alpha_beta(&mut self, board: &Board, mover: Color, ply: u8, mut alpha: i32, mut beta: i32) -> Scored {
        if self.is_leaf(board, ply) {
            return Scored::leaf(self.evaluator.evaluate(board, self.turn));
        }
        let moves = legal_moves(board, mover);
        if moves.is_empty() {
            return Scored::leaf(self.stalled(mover, self.turn, ply));
        }

        let mut best_move = None;
        if mover == self.turn {
            for mv in moves {
                let child = board.apply_move(mv);
                let score = self.alpha_beta(&child, mover.opponent(), ply + 1, alpha, beta).score;
                if score > alpha {
                    alpha = score;
                    best_move = Some(mv);
                }
                if alpha >= beta {
                    break;
                }
            }
            Scored { score: alpha, mv: best_move }
        } else {
            for mv in moves {
                let child = board.apply_move(mv);
                let score = self.alpha_beta(&child, mover.opponent(), ply + 1, alpha, beta).score;
                if score < beta {
                    beta = score;
                    best_move = Some(mv);
                }
                if alpha >= beta {
                    break;
                }
            }
            Scored { score: beta, mv: best_move }
        }
    }

    // Scores are from the mover's side; the child's score is negated and the
    // window flipped at each level.
    fn negamax(&mut self, board: &Board, mover: Color, ply: u8, mut alpha: i32, beta: i32) -> Scored {
        if self.is_leaf(board, ply) {
            return Scored::leaf(self.evaluator.evaluate(board, mover));
        }
        let moves = legal_moves(board, mover);
        if moves.is_empty() {
            return Scored::leaf(self.stalled(mover, mover, ply));
        }

        let mut best_move = None;
        for mv in moves {
            let child = board.apply_move(mv);
            let score = -self.negamax(&child, mover.opponent(), ply + 1, -beta, -alpha).score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if alpha >= beta {
                return Scored { score: beta, mv: Some(mv) };
            }
        }
        Scored { score: alpha, mv: best_move }
    }

    // Principal variation search: after the first child every sibling is
    // probed with the null window (alpha, alpha + 1) and only re-searched
    // with the full window when the probe lands at or above it.
    fn negascout(&mut self, board: &Board, mover: Color, ply: u8, mut alpha: i32, beta: i32) -> Scored {
        if self.is_leaf(board, ply) {
            return Scored::leaf(self.evaluator.evaluate(board, mover));
        }
        let moves = legal_moves(board, mover);
        if moves.is_empty() {
            return Scored::leaf(self.stalled(mover, mover, ply));
        }

        let mut best_move = None;
        let mut b = beta;
        for mv in moves {
            let child = board.apply_move(mv);
            let mut score = -self.negascout(&child, mover.opponent(), ply + 1, -b, -alpha).score;
            if score >= b && score < beta {
                score = -self.negascout(&child, mover.opponent(), ply + 1, -beta, -alpha).score;
            }
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if alpha >= beta {
                return Scored { score: alpha, mv: Some(mv) };
            }
            b = alpha + 1;
        }
        Scored { score: alpha, mv: best_move }
    }

    fn run(&mut self, algorithm: Algorithm, board: &Board, color: Color) -> Scored {
        match algorithm {
            Algorithm::Minimax => self.minimax(board, color, 0),
            Algorithm::AlphaBeta => self.alpha_beta(board, color, 0, -INFINITY, INFINITY),
            Algorithm::Negamax => self.negamax(board, color, 0, -INFINITY, INFINITY),
            Algorithm::Negascout => self.negascout(board, color, 0, -INFINITY, INFINITY),
        }
    }

    // Value of a root child, from `color`'s side, searched with a full window.
    fn score_child(&mut self, algorithm: Algorithm, child: &Board, color: Color) -> i32 {
        let opponent = color.opponent();
        let score = match algorithm {
            Algorithm::Minimax => self.minimax(child, opponent, 1).score,
            Algorithm::AlphaBeta => self.alpha_beta(child, opponent, 1, -INFINITY, INFINITY).score,
            Algorithm::Negamax => -self.negamax(child, opponent, 1, -INFINITY, INFINITY).score,
            Algorithm::Negascout => -self.negascout(child, opponent, 1, -INFINITY, INFINITY).score,
        };
        if matches!(algorithm, Algorithm::Minimax | Algorithm::AlphaBeta) && color != self.turn {
            -score
        } else {
            score
        }
    }

    fn termination(&self) -> Termination {
        if self.interrupted {
            Termination::DeadlineReached
        } else {
            Termination::DepthExhausted
        }
    }
}

/// Picks a move for `color` with the static evaluator and no deadline.
/// `turn` is the side the minimax-style searches maximize for; normally
/// the same as `color`.
pub fn choose_move(
    algorithm: Algorithm,
    board: &Board,
    color: Color,
    turn: Color,
    ply_depth: u8,
) -> Result<SearchReport, CheckersError> {
    search(algorithm, board, color, turn, ply_depth, &StaticEvaluator, &SearchLimits::default())
}

/// Runs one search from `board` with `color` to move.
///
/// The reported score is from `color`'s side for the negamax family and
/// from `turn`'s side for minimax and alpha-beta; with `turn == color` the
/// two agree. Among equally scored root moves the first one generated wins.
pub fn search<E: Evaluator + ?Sized>(
    algorithm: Algorithm,
    board: &Board,
    color: Color,
    turn: Color,
    ply_depth: u8,
    evaluator: &E,
    limits: &SearchLimits,
) -> Result<SearchReport, CheckersError> {
    let moves = legal_moves(board, color);
    let first = match moves.first() {
        Some(&mv) => mv,
        None => return Err(CheckersError::NoMovesAvailable { color }),
    };
    let ply_depth = ply_depth.clamp(MIN_DEPTH, MAX_DEPTH);

    let mut search = Search::new(evaluator, turn, ply_depth, limits);
    let result = search.run(algorithm, board, color);
    // A minimizing root records nothing when every reply is a forced loss.
    let best_move = result.mv.unwrap_or(first);
    let termination = search.termination();
    if termination == Termination::DeadlineReached {
        warn!("{algorithm} search for {color} hit its deadline after {} nodes", search.nodes);
    }
    info!(
        "{algorithm} depth {ply_depth}: {color} plays {best_move} (score {}, {} nodes)",
        result.score, search.nodes
    );

    Ok(SearchReport {
        best_move,
        score: result.score,
        nodes: search.nodes,
        termination,
    })
}

/// Root-split variant of [`search`]: one rayon task per root move, each on
/// its own board copy and its own counters. The results are reduced in move
/// order, so the chosen move and score equal the sequential search.
pub fn search_parallel<E: Evaluator + ?Sized>(
    algorithm: Algorithm,
    board: &Board,
    color: Color,
    turn: Color,
    ply_depth: u8,
    evaluator: &E,
    limits: &SearchLimits,
) -> Result<SearchReport, CheckersError> {
    let moves = legal_moves(board, color);
    if moves.is_empty() {
        return Err(CheckersError::NoMovesAvailable { color });
    }
    let ply_depth = ply_depth.clamp(MIN_DEPTH, MAX_DEPTH);

    let scored: Vec<(Move, i32, u64, Termination)> = moves
        .par_iter()
        .map(|&mv| {
            let mut search = Search::new(evaluator, turn, ply_depth, limits);
            let child = board.apply_move(mv);
            let score = search.score_child(algorithm, &child, color);
            debug!("{algorithm} root move {mv}: {score}");
            (mv, score, search.nodes, search.termination())
        })
        .collect();

    let mut best: Option<(Move, i32)> = None;
    let mut nodes = 1;
    let mut termination = Termination::DepthExhausted;
    for (mv, score, child_nodes, child_termination) in scored {
        nodes += child_nodes;
        if child_termination == Termination::DeadlineReached {
            termination = Termination::DeadlineReached;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((mv, score));
        }
    }
    let (best_move, score) = best.ok_or(CheckersError::NoMovesAvailable { color })?;
    // Scores were taken from `color`'s side; minimax-style reports use `turn`'s.
    let score = if matches!(algorithm, Algorithm::Minimax | Algorithm::AlphaBeta) && color != turn {
        -score
    } else {
        score
    };
    info!(
        "{algorithm} (parallel) depth {ply_depth}: {color} plays {best_move} (score {score}, {nodes} nodes)"
    );

    Ok(SearchReport {
        best_move,
        score,
        nodes,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate;
    use checkers_core::{Piece, Square};

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col).unwrap()
    }

    #[test]
    fn opening_moves_all_score_the_same_at_depth_one() {
        let board = Board::new();
        let moves = legal_moves(&board, Color::Black);
        assert_eq!(moves.len(), 7);
        let scores: Vec<i32> = moves
            .iter()
            .map(|&mv| evaluate(&board.apply_move(mv), Color::Black))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));

        for algorithm in Algorithm::ALL {
            let report = choose_move(algorithm, &board, Color::Black, Color::Black, 1).unwrap();
            assert!(moves.contains(&report.best_move), "{algorithm}");
            assert_eq!(report.score, scores[0], "{algorithm}");
            // Ties go to the first generated move.
            assert_eq!(report.best_move, moves[0], "{algorithm}");
        }
    }

    #[test]
    fn takes_the_free_piece() {
        let board = Board::with_pieces(&[
            (sq(4, 3), Piece::king(Color::Black)),
            (sq(3, 4), Piece::man(Color::White)),
            (sq(0, 1), Piece::man(Color::Black)),
        ]);
        for algorithm in Algorithm::ALL {
            let report = choose_move(algorithm, &board, Color::Black, Color::Black, 2).unwrap();
            assert_eq!(report.best_move, Move::new(sq(4, 3), sq(2, 5)), "{algorithm}");
        }
    }

    #[test]
    fn no_moves_is_reported() {
        let board = Board::from_rows(&[
            "........", "........", "........", "........", "........", "........", "b.......",
            ".w......",
        ])
        .unwrap();
        for algorithm in Algorithm::ALL {
            assert_eq!(
                choose_move(algorithm, &board, Color::Black, Color::Black, 3),
                Err(CheckersError::NoMovesAvailable { color: Color::Black })
            );
        }
    }

    #[test]
    fn stuck_opponent_counts_as_a_win() {
        let board = Board::from_rows(&[
            "........", "........", "........", "........", "........", "b.b.....", "........",
            "w.......",
        ])
        .unwrap();
        // 5,0 -> 6,1 leaves white's only man with no step, and its jump lands on 5,2.
        for algorithm in Algorithm::ALL {
            let report = choose_move(algorithm, &board, Color::Black, Color::Black, 2).unwrap();
            assert_eq!(report.best_move, Move::new(sq(5, 0), sq(6, 1)), "{algorithm}");
            assert_eq!(report.score, WIN_SCORE - 1, "{algorithm}");
        }
    }

    #[test]
    fn cancelled_search_still_returns_a_legal_move() {
        let flag = Arc::new(AtomicBool::new(true));
        let limits = SearchLimits {
            deadline: None,
            cancel: Some(flag),
        };
        let board = Board::new();
        let report = search(
            Algorithm::Negamax,
            &board,
            Color::White,
            Color::White,
            8,
            &StaticEvaluator,
            &limits,
        )
        .unwrap();
        assert_eq!(report.termination, Termination::DeadlineReached);
        assert!(legal_moves(&board, Color::White).contains(&report.best_move));
        // Root plus one leaf per root move.
        assert_eq!(report.nodes, 8);
    }

    #[test]
    fn algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<Algorithm>(), Ok(algorithm));
        }
        assert!("bogus".parse::<Algorithm>().is_err());
    }
}
