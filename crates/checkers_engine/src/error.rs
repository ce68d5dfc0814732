use checkers_core::CheckersError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CheckersError),

    /// Every playout of the initial population was dead, or there was no
    /// population to begin with.
    #[error("genetic search could not build a usable population")]
    DegenerateGeneticPopulation,

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
