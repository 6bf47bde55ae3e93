use std::fmt::Debug;

use crate::{
    matching::CardView,
    puzzle::{PuzzleInput, PuzzleState},
};

/// Chooses the next tap or swipe on a sliding puzzle.
pub trait PuzzleStrategy: Debug {
    fn select_input(&mut self, puzzle: &PuzzleState) -> PuzzleInput;
}

/// Chooses which card to turn over next.
///
/// The board only shows faces of cards that are currently up, so a strategy that wants
/// to remember cards keeps its own notes through [`MatchStrategy::observe`].
pub trait MatchStrategy: Debug {
    fn select_card(&mut self, board: &[CardView<'_>]) -> u32;

    fn observe(&mut self, _card_id: u32, _pair_value: &str) {}
}
