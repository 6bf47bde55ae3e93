pub mod config;
pub mod error;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use database::{ActivityTracker, ChildStore, GameProgressStore, LearningTimeTracker};
use tokio::time::sleep;
use types::{
    ActivityRecord, ActivityType, ChildId, Clock, FlipOutcome, MatchGameState, MatchStrategy,
    MoveOutcome, PuzzleState, PuzzleStrategy,
};

pub use config::SimulationConfig;
pub use error::SimulationError;

pub const PUZZLE_ACTIVITY_NAME: &str = "Sliding Puzzle";
pub const MATCHING_ACTIVITY_NAME: &str = "Card Matching";
const MATCHING_ACTIVITY_TYPE: ActivityType = ActivityType::Other;

/// Everything a game reports progress to, sharing one store and clock.
#[derive(Clone, Debug)]
pub struct Trackers {
    pub activities: ActivityTracker,
    pub learning_time: LearningTimeTracker,
    pub progress: GameProgressStore,
    clock: Arc<dyn Clock>,
}

impl Trackers {
    pub fn new(store: ChildStore, clock: Arc<dyn Clock>, activity_log_capacity: usize) -> Self {
        Self {
            activities: ActivityTracker::with_capacity(store.clone(), activity_log_capacity),
            learning_time: LearningTimeTracker::new(store.clone(), clock.clone()),
            progress: GameProgressStore::new(store),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }
}

/// Limits for one game.
#[derive(Copy, Clone, Debug)]
pub struct PlayOptions {
    pub max_inputs: u32,
    pub mismatch_delay: Duration,
}

impl From<&SimulationConfig> for PlayOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            max_inputs: config.max_moves,
            mismatch_delay: config.mismatch_delay(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PuzzleSummary {
    pub moves: u32,
    pub rejected_inputs: u32,
    pub minutes: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatchingSummary {
    pub moves: u32,
    pub pairs: u32,
    pub score: u32,
    pub minutes: u32,
}

fn elapsed_seconds(started: DateTime<Utc>, finished: DateTime<Utc>) -> u64 {
    u64::try_from((finished - started).num_seconds()).unwrap_or(0)
}

/// Plays `puzzle` to completion with `strategy`, checkpointing it after every move.
///
/// The learning session runs for the whole game. If the input limit is hit first, the
/// unfinished puzzle stays saved for later.
pub async fn run_puzzle_game(
    trackers: &Trackers,
    child_id: &ChildId,
    puzzle: &mut PuzzleState,
    strategy: &mut dyn PuzzleStrategy,
    options: PlayOptions,
) -> Result<PuzzleSummary, SimulationError> {
    let child = child_id.as_str();
    let started = trackers.now();
    trackers
        .learning_time
        .start_session(child, ActivityType::Puzzle)
        .await;

    let mut inputs = 0;
    let mut rejected_inputs = 0;
    while !puzzle.is_complete() {
        if inputs >= options.max_inputs {
            trackers.progress.save_puzzle(child, puzzle).await;
            let minutes = trackers
                .learning_time
                .end_session(child, ActivityType::Puzzle)
                .await;
            log::warn!("Stopped after {inputs} inputs ({minutes} minutes), puzzle saved");
            return Err(SimulationError::MoveLimitReached(inputs));
        }
        inputs += 1;

        log::debug!("{puzzle}");
        let input = strategy.select_input(puzzle);
        match puzzle.apply_input(input) {
            MoveOutcome::Moved { tile_id, from, to } => {
                log::debug!("Moved tile {tile_id} from {from} to {to}");
                if puzzle.is_complete() {
                    trackers.progress.record_puzzle_solved(child, puzzle).await;
                } else {
                    trackers.progress.save_puzzle(child, puzzle).await;
                }
            }
            MoveOutcome::Rejected(reason) => {
                rejected_inputs += 1;
                log::info!("Ignored {input}: {reason:?}");
            }
        }
    }

    let finished = trackers.now();
    let grid_size = puzzle.grid_size();
    log::info!("Solved {grid_size}x{grid_size} puzzle in {} moves", puzzle.move_count());
    let record = ActivityRecord::new(
        child_id.clone(),
        ActivityType::Puzzle,
        PUZZLE_ACTIVITY_NAME,
        finished,
    )
    .with_score(format!("{} moves", puzzle.move_count()))
    .with_duration_seconds(elapsed_seconds(started, finished))
    .with_details(format!("{grid_size}x{grid_size} grid"));
    trackers.activities.record_activity(record).await;

    let minutes = trackers
        .learning_time
        .end_session(child, ActivityType::Puzzle)
        .await;
    Ok(PuzzleSummary {
        moves: puzzle.move_count(),
        rejected_inputs,
        minutes,
    })
}

/// Plays `game` to completion with `strategy`.
///
/// Every found pair and the finished game are logged as activities. A mismatched pair
/// stays visible for `mismatch_delay` before being turned back over.
pub async fn run_matching_game(
    trackers: &Trackers,
    child_id: &ChildId,
    game: &mut MatchGameState,
    strategy: &mut dyn MatchStrategy,
    options: PlayOptions,
) -> Result<MatchingSummary, SimulationError> {
    let child = child_id.as_str();
    let started = trackers.now();
    trackers
        .learning_time
        .start_session(child, MATCHING_ACTIVITY_TYPE)
        .await;

    let mut inputs = 0;
    while !game.is_complete() {
        if game.awaiting_resolution() {
            sleep(options.mismatch_delay).await;
            game.resolve_mismatch();
            trackers.progress.save_card_game(child, game).await;
        }
        if inputs >= options.max_inputs {
            trackers.progress.save_card_game(child, game).await;
            trackers
                .learning_time
                .end_session(child, MATCHING_ACTIVITY_TYPE)
                .await;
            log::warn!("Stopped after {inputs} inputs, card game saved");
            return Err(SimulationError::MoveLimitReached(inputs));
        }
        inputs += 1;

        let card_id = strategy.select_card(&game.board());
        let outcome = game.flip(card_id);
        if outcome.is_applied() {
            if let Some(card) = game.card(card_id) {
                strategy.observe(card_id, &card.pair_value);
            }
        }

        match outcome {
            FlipOutcome::FirstCard { .. } => {}
            FlipOutcome::Mismatched { first, second } => {
                log::debug!("No match between {first} and {second}");
            }
            FlipOutcome::Matched { pair_value, .. } => {
                let record = ActivityRecord::new(
                    child_id.clone(),
                    MATCHING_ACTIVITY_TYPE,
                    MATCHING_ACTIVITY_NAME,
                    trackers.now(),
                )
                .with_score(format!(
                    "{}/{}",
                    game.matched_pair_count(),
                    game.pair_count()
                ))
                .with_details(format!("Found the {pair_value} pair"));
                trackers.activities.record_activity(record).await;
                trackers.progress.add_pairs_matched(child, 1).await;
                trackers.progress.save_card_game(child, game).await;
            }
            FlipOutcome::Rejected(reason) => {
                log::info!("Ignored flip of card {card_id}: {reason:?}");
            }
        }
    }

    let finished = trackers.now();
    let score = game.efficiency_score();
    let record = ActivityRecord::new(
        child_id.clone(),
        MATCHING_ACTIVITY_TYPE,
        MATCHING_ACTIVITY_NAME,
        finished,
    )
    .with_score(format!("{score}%"))
    .with_duration_seconds(elapsed_seconds(started, finished))
    .with_details(format!(
        "All {} pairs in {} moves",
        game.pair_count(),
        game.move_count()
    ));
    trackers.activities.record_activity(record).await;
    trackers.progress.increment_games_played(child).await;
    trackers.progress.clear_card_game(child).await;

    let minutes = trackers
        .learning_time
        .end_session(child, MATCHING_ACTIVITY_TYPE)
        .await;
    log::info!(
        "Matched {} pairs in {} moves, score {score}%",
        game.pair_count(),
        game.move_count()
    );
    Ok(MatchingSummary {
        moves: game.move_count(),
        pairs: game.pair_count(),
        score,
        minutes,
    })
}
