use std::{sync::Arc, time::Duration};

use chrono::{FixedOffset, TimeZone};
use database::{ChildStore, Namespace};
use rand::{rngs::StdRng, SeedableRng};
use simulation::{
    run_matching_game, run_puzzle_game, PlayOptions, SimulationError, Trackers,
    MATCHING_ACTIVITY_NAME, PUZZLE_ACTIVITY_NAME,
};
use strategies::{DefaultStrategy, RandomStrategy};
use types::{ActivityType, ChildId, ManualClock, MatchGameState, PuzzleState};

fn trackers() -> Trackers {
    let start = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 6, 10, 0, 0)
        .unwrap();
    Trackers::new(
        ChildStore::in_memory(),
        Arc::new(ManualClock::new(start)),
        50,
    )
}

fn options() -> PlayOptions {
    PlayOptions {
        max_inputs: 10_000,
        mismatch_delay: Duration::ZERO,
    }
}

fn child() -> ChildId {
    ChildId::parse("kid").unwrap()
}

#[tokio::test]
async fn test_run_puzzle_game_with_default_strategy() {
    let trackers = trackers();
    let mut rng = StdRng::seed_from_u64(21);
    let mut puzzle = PuzzleState::new_with_rng(3, &mut rng).unwrap();

    let summary = run_puzzle_game(
        &trackers,
        &child(),
        &mut puzzle,
        &mut DefaultStrategy::default(),
        options(),
    )
    .await
    .expect("Game should complete successfully");

    assert!(puzzle.is_complete());
    assert_eq!(summary.moves, puzzle.move_count());
    assert_eq!(summary.rejected_inputs, 0);

    let progress = trackers.progress.puzzle_progress("kid").await;
    assert_eq!(progress.solved_count, 1);
    assert_eq!(progress.current, None);
    assert_eq!(progress.best_move_counts.get(&3), Some(&summary.moves));

    let log = trackers.activities.query_activities("kid").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].activity_type, ActivityType::Puzzle);
    assert_eq!(log[0].activity_name, PUZZLE_ACTIVITY_NAME);
    assert_eq!(log[0].details.as_deref(), Some("3x3 grid"));
}

#[tokio::test]
async fn test_run_puzzle_game_with_random_strategy() {
    let trackers = trackers();
    let mut puzzle = PuzzleState::new(2).unwrap();

    run_puzzle_game(
        &trackers,
        &child(),
        &mut puzzle,
        &mut RandomStrategy::default(),
        options(),
    )
    .await
    .expect("A 2x2 puzzle is solved quickly by random moves");

    assert!(puzzle.is_complete());
    assert_eq!(trackers.progress.puzzle_progress("kid").await.solved_count, 1);
}

#[tokio::test]
async fn test_move_limit_keeps_puzzle_for_later() {
    let trackers = trackers();
    let mut rng = StdRng::seed_from_u64(8);
    let mut puzzle = PuzzleState::new_with_rng(4, &mut rng).unwrap();
    let limited = PlayOptions {
        max_inputs: 5,
        ..options()
    };

    let result = run_puzzle_game(
        &trackers,
        &child(),
        &mut puzzle,
        &mut DefaultStrategy::with_state_budget(10),
        limited,
    )
    .await;

    assert!(matches!(result, Err(SimulationError::MoveLimitReached(5))));
    assert_eq!(trackers.progress.load_puzzle("kid").await, Some(puzzle));
    assert!(trackers.activities.query_activities("kid").await.is_empty());
}

#[tokio::test]
async fn test_run_matching_game_records_every_pair() {
    let trackers = trackers();
    let mut rng = StdRng::seed_from_u64(2);
    let mut game = MatchGameState::new_with_rng(&["owl", "fox", "bee"], &mut rng).unwrap();

    let summary = run_matching_game(
        &trackers,
        &child(),
        &mut game,
        &mut DefaultStrategy::default(),
        options(),
    )
    .await
    .expect("Game should complete successfully");

    assert!(game.is_complete());
    assert_eq!(summary.pairs, 3);
    assert_eq!(summary.score, game.efficiency_score());

    // One record per pair, then the completion record on top.
    let log = trackers.activities.query_activities("kid").await;
    assert_eq!(log.len(), 4);
    assert!(log
        .iter()
        .all(|record| record.activity_type == ActivityType::Other
            && record.activity_name == MATCHING_ACTIVITY_NAME));
    assert_eq!(log[0].score, Some(format!("{}%", summary.score)));
    assert_eq!(log[1].score.as_deref(), Some("3/3"));
    assert_eq!(log[3].score.as_deref(), Some("1/3"));

    let stats = trackers.progress.overall_stats("kid").await;
    assert_eq!(stats.total_pairs_matched, 3);
    assert_eq!(stats.games_played, 1);
    assert!(trackers.progress.load_card_game("kid").await.is_none());
}

#[tokio::test]
async fn test_run_matching_game_with_random_strategy_and_delay() {
    let trackers = trackers();
    let mut game = MatchGameState::new(&["a", "b"]).unwrap();
    let delayed = PlayOptions {
        mismatch_delay: Duration::from_millis(5),
        ..options()
    };

    run_matching_game(
        &trackers,
        &child(),
        &mut game,
        &mut RandomStrategy::default(),
        delayed,
    )
    .await
    .expect("Game should complete successfully");

    assert!(game.is_complete());
    assert_eq!(trackers.progress.overall_stats("kid").await.games_played, 1);
}

#[tokio::test]
async fn test_sessions_do_not_linger_after_games() {
    let store = ChildStore::in_memory();
    let start = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 6, 10, 0, 0)
        .unwrap();
    let trackers = Trackers::new(store.clone(), Arc::new(ManualClock::new(start)), 50);
    let mut game = MatchGameState::new(&["x"]).unwrap();

    run_matching_game(
        &trackers,
        &child(),
        &mut game,
        &mut DefaultStrategy::default(),
        options(),
    )
    .await
    .unwrap();

    let marker = store
        .try_load::<database::SessionMarker>(Namespace::SessionStart(ActivityType::Other), "kid")
        .await
        .unwrap();
    assert_eq!(marker, None);
}
