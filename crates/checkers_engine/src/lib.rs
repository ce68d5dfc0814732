pub mod ai;
pub mod error;
pub mod evaluation;
pub mod genetic;
pub mod reservation;
pub mod search;

pub use ai::{CheckersAi, MoveChoice, Player, Strategy};
pub use error::EngineError;
pub use evaluation::{evaluate, EvalConfig, Evaluator, StaticEvaluator};
pub use genetic::{choose_move_genetic, Chromosome, GeneticConfig, GeneticOutcome};
pub use reservation::ReservationTree;
pub use search::{choose_move, search, search_parallel, Algorithm, SearchLimits, SearchReport, Termination};
