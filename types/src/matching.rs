use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use itertools::Itertools;
use rand::{seq::SliceRandom, thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::GameSetupError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCard {
    pub id: u32,
    pub pair_value: String,
    pub is_flipped: bool,
    pub is_matched: bool,
}

/// What a player is allowed to see of a card: its face only while it is turned up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CardView<'a> {
    pub id: u32,
    pub face: Option<&'a str>,
    pub is_matched: bool,
}

/// State of a pairs-of-cards memory game.
///
/// At most two face-up, unmatched cards exist at any time. A mismatched pair stays
/// face-up until [`MatchGameState::resolve_mismatch`] is called, which lets the caller
/// show both faces for a while before hiding them again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMatchGameState")]
pub struct MatchGameState {
    cards: Vec<MatchCard>,
    flipped_unresolved: Vec<u32>,
    matched_pair_count: u32,
    move_count: u32,
}

#[derive(Deserialize)]
struct RawMatchGameState {
    cards: Vec<MatchCard>,
    #[serde(default)]
    flipped_unresolved: Vec<u32>,
    #[serde(default)]
    move_count: u32,
}

impl TryFrom<RawMatchGameState> for MatchGameState {
    type Error = GameSetupError;

    fn try_from(raw: RawMatchGameState) -> Result<Self, Self::Error> {
        MatchGameState::from_parts(raw.cards, raw.flipped_unresolved, raw.move_count)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlipOutcome {
    FirstCard {
        card_id: u32,
    },
    Matched {
        first: u32,
        second: u32,
        pair_value: String,
        game_complete: bool,
    },
    Mismatched {
        first: u32,
        second: u32,
    },
    Rejected(FlipRejection),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlipRejection {
    UnknownCard(u32),
    AlreadyFaceUp(u32),
    AlreadyMatched(u32),
    AwaitingResolution,
    GameComplete,
}

impl FlipOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, FlipOutcome::Rejected(_))
    }
}

impl MatchGameState {
    pub fn new<S: AsRef<str>>(pair_values: &[S]) -> Result<Self, GameSetupError> {
        Self::new_with_rng(pair_values, &mut thread_rng())
    }

    /// Deals two cards per value and shuffles the deck. Card ids are the dealt slots.
    pub fn new_with_rng<S: AsRef<str>, R: Rng + ?Sized>(
        pair_values: &[S],
        rng: &mut R,
    ) -> Result<Self, GameSetupError> {
        if pair_values.is_empty() {
            return Err(GameSetupError::NoPairs);
        }
        if let Some(duplicate) = pair_values
            .iter()
            .map(|value| value.as_ref())
            .duplicates()
            .next()
        {
            return Err(GameSetupError::DuplicatePairValue(duplicate.to_string()));
        }

        let mut faces: Vec<&str> = pair_values
            .iter()
            .flat_map(|value| [value.as_ref(), value.as_ref()])
            .collect();
        faces.shuffle(rng);

        let cards = faces
            .into_iter()
            .enumerate()
            .map(|(idx, face)| MatchCard {
                id: idx as u32,
                pair_value: face.to_string(),
                is_flipped: false,
                is_matched: false,
            })
            .collect();
        log::info!("Dealt {} pairs", pair_values.len());
        Ok(Self {
            cards,
            flipped_unresolved: Vec::with_capacity(2),
            matched_pair_count: 0,
            move_count: 0,
        })
    }

    /// Rebuilds a game from saved parts, recomputing the matched pair count.
    pub fn from_parts(
        cards: Vec<MatchCard>,
        flipped_unresolved: Vec<u32>,
        move_count: u32,
    ) -> Result<Self, GameSetupError> {
        if cards.is_empty() {
            return Err(GameSetupError::NoPairs);
        }
        if let Some(id) = cards.iter().map(|card| card.id).duplicates().next() {
            return Err(GameSetupError::InvalidDeck(format!("card id {id} is used twice")));
        }

        let mut by_value: HashMap<&str, Vec<&MatchCard>> = HashMap::new();
        for card in &cards {
            by_value.entry(card.pair_value.as_str()).or_default().push(card);
        }
        for (value, pair) in &by_value {
            if pair.len() != 2 {
                return Err(GameSetupError::InvalidDeck(format!(
                    "value {value:?} appears on {} cards",
                    pair.len()
                )));
            }
            if pair[0].is_matched != pair[1].is_matched {
                return Err(GameSetupError::InvalidDeck(format!(
                    "only one card of {value:?} is matched"
                )));
            }
        }

        if flipped_unresolved.len() > 2 {
            return Err(GameSetupError::InvalidDeck(format!(
                "{} unresolved face-up cards",
                flipped_unresolved.len()
            )));
        }
        let face_up_unmatched: HashSet<u32> = cards
            .iter()
            .filter(|card| card.is_flipped && !card.is_matched)
            .map(|card| card.id)
            .collect();
        let unresolved: HashSet<u32> = flipped_unresolved.iter().copied().collect();
        if face_up_unmatched != unresolved || unresolved.len() != flipped_unresolved.len() {
            return Err(GameSetupError::InvalidDeck(
                "face-up cards disagree with the unresolved list".to_string(),
            ));
        }

        let matched_pair_count = (cards.iter().filter(|card| card.is_matched).count() / 2) as u32;
        Ok(Self {
            cards,
            flipped_unresolved,
            matched_pair_count,
            move_count,
        })
    }

    pub fn cards(&self) -> &[MatchCard] {
        &self.cards
    }

    pub fn card(&self, card_id: u32) -> Option<&MatchCard> {
        self.cards.iter().find(|card| card.id == card_id)
    }

    pub fn flipped_unresolved(&self) -> Vec<&MatchCard> {
        self.flipped_unresolved
            .iter()
            .filter_map(|&id| self.card(id))
            .collect()
    }

    pub fn matched_pair_count(&self) -> u32 {
        self.matched_pair_count
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn pair_count(&self) -> u32 {
        (self.cards.len() / 2) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.matched_pair_count == self.pair_count()
    }

    /// True while a mismatched pair is still face-up.
    pub fn awaiting_resolution(&self) -> bool {
        self.flipped_unresolved.len() == 2
    }

    pub fn board(&self) -> Vec<CardView<'_>> {
        self.cards
            .iter()
            .map(|card| CardView {
                id: card.id,
                face: (card.is_flipped || card.is_matched).then_some(card.pair_value.as_str()),
                is_matched: card.is_matched,
            })
            .collect()
    }

    pub fn flip(&mut self, card_id: u32) -> FlipOutcome {
        if self.is_complete() {
            return FlipOutcome::Rejected(FlipRejection::GameComplete);
        }
        if self.awaiting_resolution() {
            return FlipOutcome::Rejected(FlipRejection::AwaitingResolution);
        }
        let Some(card) = self.cards.iter_mut().find(|card| card.id == card_id) else {
            return FlipOutcome::Rejected(FlipRejection::UnknownCard(card_id));
        };
        if card.is_matched {
            return FlipOutcome::Rejected(FlipRejection::AlreadyMatched(card_id));
        }
        if card.is_flipped {
            return FlipOutcome::Rejected(FlipRejection::AlreadyFaceUp(card_id));
        }

        card.is_flipped = true;
        self.flipped_unresolved.push(card_id);
        if self.flipped_unresolved.len() < 2 {
            return FlipOutcome::FirstCard { card_id };
        }

        self.move_count += 1;
        let (first, second) = (self.flipped_unresolved[0], self.flipped_unresolved[1]);
        let first_value = self.pair_value_of(first);
        if first_value != self.pair_value_of(second) {
            log::debug!("Cards {first} and {second} do not match");
            return FlipOutcome::Mismatched { first, second };
        }

        let pair_value = first_value.to_string();
        for card in self.cards.iter_mut() {
            if card.id == first || card.id == second {
                card.is_matched = true;
            }
        }
        self.flipped_unresolved.clear();
        self.matched_pair_count += 1;
        let game_complete = self.is_complete();
        log::debug!(
            "Matched {pair_value:?} ({}/{} pairs, move {})",
            self.matched_pair_count,
            self.pair_count(),
            self.move_count
        );
        if game_complete {
            log::info!(
                "All {} pairs found in {} moves",
                self.pair_count(),
                self.move_count
            );
        }
        FlipOutcome::Matched {
            first,
            second,
            pair_value,
            game_complete,
        }
    }

    /// Turns a mismatched pair face-down again. Returns whether anything was hidden.
    pub fn resolve_mismatch(&mut self) -> bool {
        if !self.awaiting_resolution() {
            return false;
        }
        for card in self.cards.iter_mut() {
            if self.flipped_unresolved.contains(&card.id) {
                card.is_flipped = false;
            }
        }
        self.flipped_unresolved.clear();
        true
    }

    /// `max(0, 100 - floor((moves - perfect) / perfect * 50))` with one move per pair
    /// counted as perfect.
    pub fn efficiency_score(&self) -> u32 {
        let perfect = self.pair_count();
        if perfect == 0 {
            return 100;
        }
        let extra_moves = u64::from(self.move_count.saturating_sub(perfect));
        let penalty = extra_moves * 50 / u64::from(perfect);
        100u64.saturating_sub(penalty) as u32
    }

    fn pair_value_of(&self, card_id: u32) -> &str {
        self.card(card_id)
            .map(|card| card.pair_value.as_str())
            .expect("Unresolved ids always refer to cards in the deck")
    }
}

impl Display for MatchGameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cards = self
            .board()
            .iter()
            .map(|view| match view.face {
                Some(face) => format!("[{}:{face}]", view.id),
                None => format!("[{}:?]", view.id),
            })
            .join(" ");
        write!(
            f,
            "{cards}\nPairs: {}/{} Moves: {}",
            self.matched_pair_count,
            self.pair_count(),
            self.move_count
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const ANIMALS: [&str; 8] = [
        "lion", "zebra", "hippo", "giraffe", "monkey", "parrot", "turtle", "elephant",
    ];

    fn partner_of(game: &MatchGameState, card_id: u32) -> u32 {
        let value = &game.card(card_id).unwrap().pair_value;
        game.cards()
            .iter()
            .find(|card| card.id != card_id && &card.pair_value == value)
            .unwrap()
            .id
    }

    fn non_partner_of(game: &MatchGameState, card_id: u32) -> u32 {
        let value = &game.card(card_id).unwrap().pair_value;
        game.cards()
            .iter()
            .find(|card| !card.is_matched && &card.pair_value != value)
            .unwrap()
            .id
    }

    fn first_unmatched(game: &MatchGameState) -> u32 {
        game.cards().iter().find(|card| !card.is_matched).unwrap().id
    }

    fn play(game: &mut MatchGameState, mistakes: u32) {
        for _ in 0..mistakes {
            let first = first_unmatched(game);
            let second = non_partner_of(game, first);
            game.flip(first);
            assert!(matches!(game.flip(second), FlipOutcome::Mismatched { .. }));
            assert!(game.resolve_mismatch());
        }
        while !game.is_complete() {
            let first = first_unmatched(game);
            let second = partner_of(game, first);
            game.flip(first);
            assert!(matches!(game.flip(second), FlipOutcome::Matched { .. }));
        }
    }

    #[test]
    fn test_new_deals_two_cards_per_value() {
        let game = MatchGameState::new_with_rng(&ANIMALS, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(game.cards().len(), 16);
        assert_eq!(game.pair_count(), 8);
        for value in ANIMALS {
            assert_eq!(
                game.cards().iter().filter(|c| c.pair_value == value).count(),
                2
            );
        }
        let ids: HashSet<u32> = game.cards().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 16);
        assert!(game.cards().iter().all(|c| !c.is_flipped && !c.is_matched));
        assert!(game.board().iter().all(|view| view.face.is_none()));
    }

    #[test]
    fn test_setup_errors() {
        let empty: [&str; 0] = [];
        assert_eq!(MatchGameState::new(&empty).unwrap_err(), GameSetupError::NoPairs);
        assert_eq!(
            MatchGameState::new(&["sun", "moon", "sun"]).unwrap_err(),
            GameSetupError::DuplicatePairValue("sun".to_string())
        );
    }

    #[test]
    fn test_match_marks_pair_and_clears_unresolved() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        let first = game.cards()[0].id;
        let second = partner_of(&game, first);

        assert_eq!(game.flip(first), FlipOutcome::FirstCard { card_id: first });
        assert_eq!(game.flipped_unresolved().len(), 1);
        assert_eq!(game.move_count(), 0);

        let outcome = game.flip(second);
        assert!(matches!(
            outcome,
            FlipOutcome::Matched { game_complete: false, .. }
        ));
        assert_eq!(game.matched_pair_count(), 1);
        assert_eq!(game.move_count(), 1);
        assert!(game.flipped_unresolved().is_empty());
        assert!(game.card(first).unwrap().is_matched);
        assert!(game.card(second).unwrap().is_matched);
        assert_eq!(
            game.matched_pair_count() as usize * 2,
            game.cards().iter().filter(|c| c.is_matched).count()
        );
    }

    #[test]
    fn test_mismatch_flips_back_after_resolution() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        let first = game.cards()[0].id;
        let second = non_partner_of(&game, first);

        game.flip(first);
        assert_eq!(
            game.flip(second),
            FlipOutcome::Mismatched { first, second }
        );
        assert_eq!(game.move_count(), 1);
        assert!(game.awaiting_resolution());

        // a third card cannot be turned while the pair is still showing
        let third = game
            .cards()
            .iter()
            .find(|c| c.id != first && c.id != second)
            .unwrap()
            .id;
        assert_eq!(
            game.flip(third),
            FlipOutcome::Rejected(FlipRejection::AwaitingResolution)
        );

        assert!(game.resolve_mismatch());
        assert!(!game.card(first).unwrap().is_flipped);
        assert!(!game.card(second).unwrap().is_flipped);
        assert_eq!(game.matched_pair_count(), 0);
        assert_eq!(game.move_count(), 1);
        assert!(game.flipped_unresolved().is_empty());
        assert!(!game.resolve_mismatch());
    }

    #[test]
    fn test_rejected_flips_leave_state_unchanged() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        let first = game.cards()[0].id;
        game.flip(first);
        let before = game.clone();
        assert_eq!(
            game.flip(first),
            FlipOutcome::Rejected(FlipRejection::AlreadyFaceUp(first))
        );
        assert_eq!(
            game.flip(404),
            FlipOutcome::Rejected(FlipRejection::UnknownCard(404))
        );
        assert_eq!(game, before);

        let partner = partner_of(&game, first);
        game.flip(partner);
        assert_eq!(
            game.flip(first),
            FlipOutcome::Rejected(FlipRejection::AlreadyMatched(first))
        );
    }

    #[test]
    fn test_perfect_game_scores_100() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        play(&mut game, 0);
        assert!(game.is_complete());
        assert_eq!(game.move_count(), 8);
        assert_eq!(game.efficiency_score(), 100);
        assert_eq!(
            game.flip(0),
            FlipOutcome::Rejected(FlipRejection::GameComplete)
        );
    }

    #[test]
    fn test_twelve_moves_for_eight_pairs_scores_75() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        play(&mut game, 4);
        assert_eq!(game.move_count(), 12);
        assert_eq!(game.efficiency_score(), 75);
    }

    #[test]
    fn test_score_never_drops_below_zero() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        play(&mut game, 32);
        assert_eq!(game.move_count(), 40);
        assert_eq!(game.efficiency_score(), 0);
    }

    #[test]
    fn test_last_match_reports_completion() {
        let mut game = MatchGameState::new(&["star"]).unwrap();
        game.flip(0);
        match game.flip(1) {
            FlipOutcome::Matched {
                pair_value,
                game_complete,
                ..
            } => {
                assert_eq!(pair_value, "star");
                assert!(game_complete);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_saved_game_round_trips_mid_mismatch() {
        let mut game = MatchGameState::new(&ANIMALS).unwrap();
        let first = game.cards()[0].id;
        let partner = partner_of(&game, first);
        game.flip(first);
        game.flip(partner);
        let next = first_unmatched(&game);
        game.flip(next);
        game.flip(non_partner_of(&game, next));

        let json = serde_json::to_string(&game).unwrap();
        let restored: MatchGameState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, game);
        assert_eq!(restored.matched_pair_count(), 1);
        assert!(restored.awaiting_resolution());
    }

    #[test]
    fn test_inconsistent_saved_deck_is_rejected() {
        let cards = vec![
            MatchCard {
                id: 0,
                pair_value: "a".to_string(),
                is_flipped: true,
                is_matched: false,
            },
            MatchCard {
                id: 1,
                pair_value: "a".to_string(),
                is_flipped: false,
                is_matched: false,
            },
        ];
        assert!(MatchGameState::from_parts(cards.clone(), vec![], 0).is_err());
        assert!(MatchGameState::from_parts(cards, vec![0], 0).is_ok());
    }

    #[test]
    fn test_huge_saved_move_count_scores_zero() {
        let cards = vec![
            MatchCard {
                id: 0,
                pair_value: "a".to_string(),
                is_flipped: false,
                is_matched: false,
            },
            MatchCard {
                id: 1,
                pair_value: "a".to_string(),
                is_flipped: false,
                is_matched: false,
            },
        ];
        let game = MatchGameState::from_parts(cards, vec![], u32::MAX).unwrap();
        assert_eq!(game.efficiency_score(), 0);
    }
}
