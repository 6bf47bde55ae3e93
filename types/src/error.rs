use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameSetupError {
    #[error("Puzzle grid must be at least 2x2, got {0}x{0}")]
    GridTooSmall(usize),

    #[error("Invalid puzzle arrangement: {0}")]
    InvalidArrangement(String),

    #[error("Matching game needs at least one pair")]
    NoPairs,

    #[error("Pair value appears more than once: {0}")]
    DuplicatePairValue(String),

    #[error("Invalid card deck: {0}")]
    InvalidDeck(String),
}
