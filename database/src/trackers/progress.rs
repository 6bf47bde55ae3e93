use types::{MatchGameState, OverallStats, PuzzleState};

use crate::{
    child_store::{log_fallback, ChildStore, WriteOutcome},
    models::PuzzleProgress,
    namespace::Namespace,
};

/// Saved games and lifetime counters for the puzzle and card games.
#[derive(Clone, Debug)]
pub struct GameProgressStore {
    store: ChildStore,
}

impl GameProgressStore {
    pub fn new(store: ChildStore) -> Self {
        Self { store }
    }

    pub async fn puzzle_progress(&self, child_id: &str) -> PuzzleProgress {
        self.store
            .load(Namespace::PuzzleProgress, child_id, PuzzleProgress::default())
            .await
    }

    /// Keeps `puzzle` as the one to resume. A finished puzzle is never kept.
    pub async fn save_puzzle(&self, child_id: &str, puzzle: &PuzzleState) -> WriteOutcome {
        if puzzle.is_complete() {
            return self.record_puzzle_solved(child_id, puzzle).await;
        }
        let puzzle = puzzle.clone();
        self.store
            .update(
                Namespace::PuzzleProgress,
                child_id,
                PuzzleProgress::default,
                move |progress: &mut PuzzleProgress| progress.current = Some(puzzle),
            )
            .await
    }

    pub async fn load_puzzle(&self, child_id: &str) -> Option<PuzzleState> {
        self.puzzle_progress(child_id).await.current
    }

    pub async fn clear_puzzle(&self, child_id: &str) -> WriteOutcome {
        self.store
            .update(
                Namespace::PuzzleProgress,
                child_id,
                PuzzleProgress::default,
                |progress: &mut PuzzleProgress| progress.current = None,
            )
            .await
    }

    pub async fn record_puzzle_solved(&self, child_id: &str, puzzle: &PuzzleState) -> WriteOutcome {
        let grid_size = puzzle.grid_size();
        let moves = puzzle.move_count();
        self.store
            .update(
                Namespace::PuzzleProgress,
                child_id,
                PuzzleProgress::default,
                move |progress: &mut PuzzleProgress| {
                    if progress.record_solved(grid_size, moves) {
                        tracing::info!("New best for {0}x{0} puzzle: {1} moves", grid_size, moves);
                    }
                },
            )
            .await
    }

    pub async fn save_card_game(&self, child_id: &str, game: &MatchGameState) -> WriteOutcome {
        self.store.save(Namespace::CardGameState, child_id, game).await
    }

    pub async fn load_card_game(&self, child_id: &str) -> Option<MatchGameState> {
        match self
            .store
            .try_load::<MatchGameState>(Namespace::CardGameState, child_id)
            .await
        {
            Ok(game) => game,
            Err(e) => {
                log_fallback(Namespace::CardGameState, "read", &e);
                None
            }
        }
    }

    pub async fn clear_card_game(&self, child_id: &str) -> WriteOutcome {
        self.store.remove(Namespace::CardGameState, child_id).await
    }

    pub async fn overall_stats(&self, child_id: &str) -> OverallStats {
        self.store
            .load(Namespace::CardGameOverallStats, child_id, OverallStats::default())
            .await
    }

    pub async fn add_pairs_matched(&self, child_id: &str, pairs: u32) -> WriteOutcome {
        if pairs == 0 {
            return WriteOutcome::Unchanged;
        }
        self.store
            .update(
                Namespace::CardGameOverallStats,
                child_id,
                OverallStats::default,
                move |stats: &mut OverallStats| stats.add_pairs_matched(pairs),
            )
            .await
    }

    pub async fn increment_games_played(&self, child_id: &str) -> WriteOutcome {
        self.store
            .update(
                Namespace::CardGameOverallStats,
                child_id,
                OverallStats::default,
                |stats: &mut OverallStats| stats.increment_games_played(),
            )
            .await
    }
}
