pub mod input_strategy;
pub mod solver;

use std::collections::{HashMap, VecDeque};

use rand::{rngs::ThreadRng, seq::SliceRandom, Rng};
use types::{CardView, MatchStrategy, PuzzleInput, PuzzleState, PuzzleStrategy};

pub use crate::input_strategy::InputStrategy;
pub use crate::solver::DEFAULT_STATE_BUDGET;

fn face_down_cards<'a>(board: &'a [CardView<'a>]) -> impl Iterator<Item = &'a CardView<'a>> {
    board
        .iter()
        .filter(|card| card.face.is_none() && !card.is_matched)
}

#[derive(Debug, Default)]
pub struct RandomStrategy {
    rng: ThreadRng,
}

impl PuzzleStrategy for RandomStrategy {
    fn select_input(&mut self, puzzle: &PuzzleState) -> PuzzleInput {
        let tile_id = *puzzle
            .movable_tiles()
            .choose(&mut self.rng)
            .expect("A puzzle always has a tile next to the blank");

        // Half the time swipe the tile toward the blank instead of tapping it.
        let empty = puzzle.find_empty_position();
        let direction = puzzle
            .tile(tile_id)
            .and_then(|tile| tile.current_position.direction_to(&empty));
        match direction {
            Some(direction) if self.rng.gen_bool(0.5) => {
                PuzzleInput::Swipe { tile_id, direction }
            }
            _ => PuzzleInput::Tap(tile_id),
        }
    }
}

impl MatchStrategy for RandomStrategy {
    fn select_card(&mut self, board: &[CardView<'_>]) -> u32 {
        let choices: Vec<u32> = face_down_cards(board).map(|card| card.id).collect();
        *choices
            .choose(&mut self.rng)
            .expect("Should always have a face-down card to choose from")
    }
}

/// Plays each game as well as it can: remembers every card it has seen and solves
/// small puzzles outright.
#[derive(Debug)]
pub struct DefaultStrategy {
    state_budget: usize,
    plan: VecDeque<u32>,
    plan_board: Vec<Option<u32>>,
    last_tile: Option<u32>,
    seen_faces: HashMap<u32, String>,
    rng: ThreadRng,
}

impl Default for DefaultStrategy {
    fn default() -> Self {
        Self::with_state_budget(DEFAULT_STATE_BUDGET)
    }
}

impl DefaultStrategy {
    pub fn with_state_budget(state_budget: usize) -> Self {
        Self {
            state_budget,
            plan: VecDeque::new(),
            plan_board: Vec::new(),
            last_tile: None,
            seen_faces: HashMap::new(),
            rng: ThreadRng::default(),
        }
    }

    fn replan(&mut self, puzzle: &PuzzleState) {
        self.plan_board = puzzle.board();
        self.plan = solver::solve(&self.plan_board, puzzle.grid_size(), self.state_budget)
            .map(VecDeque::from)
            .unwrap_or_default();
        if self.plan.is_empty() {
            log::debug!(
                "No plan for this {0}x{0} puzzle, moving at random",
                puzzle.grid_size()
            );
        } else {
            log::debug!("Planned a {}-move solution", self.plan.len());
        }
    }

    fn wander(&mut self, puzzle: &PuzzleState) -> u32 {
        let movable = puzzle.movable_tiles();
        // Don't slide straight back unless there is no other way.
        let forward: Vec<u32> = movable
            .iter()
            .copied()
            .filter(|tile| Some(*tile) != self.last_tile)
            .collect();
        let choices = if forward.is_empty() { &movable } else { &forward };
        *choices
            .choose(&mut self.rng)
            .expect("A puzzle always has a tile next to the blank")
    }

    fn remembered_pair_for(
        &self,
        board: &[CardView<'_>],
        face: &str,
        exclude: u32,
    ) -> Option<u32> {
        face_down_cards(board).map(|card| card.id).find(|id| {
            *id != exclude && self.seen_faces.get(id).map(String::as_str) == Some(face)
        })
    }

    fn remembered_pair(&self, board: &[CardView<'_>]) -> Option<u32> {
        let mut by_face: HashMap<&str, u32> = HashMap::new();
        for card in face_down_cards(board) {
            let Some(face) = self.seen_faces.get(&card.id) else {
                continue;
            };
            if by_face.insert(face.as_str(), card.id).is_some() {
                return Some(card.id);
            }
        }
        None
    }
}

impl PuzzleStrategy for DefaultStrategy {
    fn select_input(&mut self, puzzle: &PuzzleState) -> PuzzleInput {
        if self.plan.is_empty() || puzzle.board() != self.plan_board {
            self.replan(puzzle);
        }

        let tile_id = match self.plan.pop_front() {
            Some(tile_id) => tile_id,
            None => self.wander(puzzle),
        };
        solver::apply_tap(&mut self.plan_board, tile_id);
        self.last_tile = Some(tile_id);
        PuzzleInput::Tap(tile_id)
    }
}

impl MatchStrategy for DefaultStrategy {
    fn select_card(&mut self, board: &[CardView<'_>]) -> u32 {
        let face_up = board
            .iter()
            .find(|card| card.face.is_some() && !card.is_matched);

        let known = match face_up {
            // Second card of the turn: finish the pair if its partner has been seen.
            Some(CardView {
                id,
                face: Some(face),
                ..
            }) => self.remembered_pair_for(board, face, *id),
            // First card: start with a pair already known in full.
            _ => self.remembered_pair(board),
        };
        if let Some(card_id) = known {
            return card_id;
        }

        let unseen: Vec<u32> = face_down_cards(board)
            .map(|card| card.id)
            .filter(|id| !self.seen_faces.contains_key(id))
            .collect();
        if let Some(card_id) = unseen.choose(&mut self.rng) {
            return *card_id;
        }

        face_down_cards(board)
            .map(|card| card.id)
            .next()
            .expect("Should always have a face-down card to choose from")
    }

    fn observe(&mut self, card_id: u32, pair_value: &str) {
        self.seen_faces.insert(card_id, pair_value.to_string());
    }
}
