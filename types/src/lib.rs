pub mod activity;
pub mod child;
pub mod clock;
pub mod error;
pub mod matching;
pub mod player;
pub mod position;
pub mod puzzle;
pub mod stats;
pub mod week;

pub use activity::{ActivityRecord, ActivityType};
pub use child::{ChildId, InvalidChildId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GameSetupError;
pub use matching::{CardView, FlipOutcome, FlipRejection, MatchCard, MatchGameState};
pub use player::{MatchStrategy, PuzzleStrategy};
pub use position::{can_move, Direction, Position};
pub use puzzle::{MoveOutcome, MoveRejection, PuzzleInput, PuzzleState, PuzzleTile};
pub use stats::{OverallStats, WeeklyStats};
