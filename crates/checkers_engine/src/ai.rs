use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use checkers_core::{legal_moves, Board, CheckersError, Color, Move};
use log::{info, warn};
use rand::rngs::StdRng;

use crate::evaluation::{EvalConfig, Evaluator};
use crate::genetic::{choose_move_genetic, GeneticConfig};
use crate::search::{search, search_parallel, Algorithm, SearchLimits, MAX_DEPTH, MIN_DEPTH};
use crate::EngineError;

const DEFAULT_DEPTH: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Minimax,
    AlphaBeta,
    Negamax,
    Negascout,
    Genetic,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Minimax,
        Strategy::AlphaBeta,
        Strategy::Negamax,
        Strategy::Negascout,
        Strategy::Genetic,
    ];

    /// The tree search behind this strategy; `None` for the genetic one.
    pub fn algorithm(self) -> Option<Algorithm> {
        match self {
            Strategy::Minimax => Some(Algorithm::Minimax),
            Strategy::AlphaBeta => Some(Algorithm::AlphaBeta),
            Strategy::Negamax => Some(Algorithm::Negamax),
            Strategy::Negascout => Some(Algorithm::Negascout),
            Strategy::Genetic => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.algorithm() {
            Some(algorithm) => write!(f, "{algorithm}"),
            None => f.write_str("genetic"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("genetic") || s.eq_ignore_ascii_case("ga") {
            return Ok(Strategy::Genetic);
        }
        match s.parse::<Algorithm>() {
            Ok(Algorithm::Minimax) => Ok(Strategy::Minimax),
            Ok(Algorithm::AlphaBeta) => Ok(Strategy::AlphaBeta),
            Ok(Algorithm::Negamax) => Ok(Strategy::Negamax),
            Ok(Algorithm::Negascout) => Ok(Strategy::Negascout),
            Err(_) => Err(format!("unknown strategy '{s}'")),
        }
    }
}

/// One side of a game: who it plays, how it searches and how deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub color: Color,
    pub strategy: Strategy,
    pub ply_depth: u8,
}

impl Player {
    pub fn new(color: Color, strategy: Strategy, ply_depth: u8) -> Self {
        Player {
            color,
            strategy,
            ply_depth: ply_depth.clamp(MIN_DEPTH, MAX_DEPTH),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveChoice {
    pub mv: Move,
    /// From the mover's side.
    pub score: i32,
    pub strategy: Strategy,
    /// Nodes visited; the genetic strategy does not count them.
    pub nodes: Option<u64>,
    pub elapsed: Duration,
}

/// Computer player for one side of the board.
pub struct CheckersAi {
    player: Player,
    genetic: GeneticConfig,
    eval: EvalConfig,
    evaluator: Box<dyn Evaluator>,
    limits: SearchLimits,
    parallel: bool,
    rng: StdRng,
}

impl CheckersAi {
    pub fn new(player: Player) -> Self {
        let genetic = GeneticConfig::default();
        let eval = EvalConfig::default();
        CheckersAi {
            player,
            evaluator: eval.build(genetic.seed),
            rng: genetic.rng(),
            genetic,
            eval,
            limits: SearchLimits::default(),
            parallel: false,
        }
    }

    /// Replaces the genetic settings and reseeds the player's generator.
    pub fn with_genetic(mut self, genetic: GeneticConfig) -> Self {
        self.rng = genetic.rng();
        self.genetic = genetic;
        self.evaluator = self.eval.build(genetic.seed);
        self
    }

    /// Turns on evaluation noise of relative amplitude `noise`.
    pub fn with_eval_noise(mut self, noise: f64) -> Self {
        self.eval = EvalConfig { noise: Some(noise) };
        self.evaluator = self.eval.build(self.genetic.seed);
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Splits tree searches over the rayon pool at the root.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Picks a move for the player's color on `board`.
    pub fn choose_move(&mut self, board: &Board) -> Result<MoveChoice, EngineError> {
        let start_time = Instant::now();
        let Player {
            color,
            strategy,
            ply_depth,
        } = self.player;

        let (mv, score, nodes) = match strategy.algorithm() {
            Some(algorithm) => {
                let evaluator = self.evaluator.as_ref();
                let report = if self.parallel {
                    search_parallel(algorithm, board, color, color, ply_depth, evaluator, &self.limits)?
                } else {
                    search(algorithm, board, color, color, ply_depth, evaluator, &self.limits)?
                };
                (report.best_move, report.score, Some(report.nodes))
            }
            None => {
                let outcome = choose_move_genetic(
                    &mut self.rng,
                    board,
                    color,
                    ply_depth,
                    &self.genetic,
                    self.evaluator.as_ref(),
                )?;
                (outcome.best_move, outcome.score, None)
            }
        };

        ensure_legal(board, mv, color)?;

        let elapsed = start_time.elapsed();
        info!("{color} ({strategy}) plays {mv} after {elapsed:?}");
        Ok(MoveChoice {
            mv,
            score,
            strategy,
            nodes,
            elapsed,
        })
    }
}

// Chosen moves must be legal for `color`; a refused one is reported, never replaced.
fn ensure_legal(board: &Board, mv: Move, color: Color) -> Result<(), CheckersError> {
    if legal_moves(board, color).contains(&mv) {
        Ok(())
    } else {
        warn!("engine proposed illegal move {mv} for {color}");
        Err(CheckersError::IllegalMove { mv, color })
    }
}

impl Default for CheckersAi {
    fn default() -> Self {
        CheckersAi::new(Player::new(Color::Black, Strategy::AlphaBeta, DEFAULT_DEPTH))
    }
}
