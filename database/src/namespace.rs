use std::{borrow::Cow, fmt::Display};

use types::{ActivityType, ChildId};

/// The fixed set of data categories stored per child.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    PuzzleProgress,
    CardGameState,
    CardGameOverallStats,
    Activities,
    WeeklyLearningStats,
    SessionStart(ActivityType),
}

impl Namespace {
    pub fn prefix(&self) -> Cow<'static, str> {
        match self {
            Namespace::PuzzleProgress => Cow::Borrowed("puzzle_progress"),
            Namespace::CardGameState => Cow::Borrowed("card_game_state"),
            Namespace::CardGameOverallStats => Cow::Borrowed("card_game_overall_stats"),
            Namespace::Activities => Cow::Borrowed("activities"),
            Namespace::WeeklyLearningStats => Cow::Borrowed("weekly_learning_stats"),
            Namespace::SessionStart(kind) => Cow::Owned(format!("session_start_{kind}")),
        }
    }

    /// `<prefix>:<child id>`. Distinct children never share a key.
    pub fn key(&self, child_id: &ChildId) -> String {
        format!("{}:{}", self.prefix(), child_id)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
