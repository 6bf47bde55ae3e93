pub mod activity;
pub mod learning_time;
pub mod progress;

pub use activity::{ActivityTracker, DEFAULT_ACTIVITY_LOG_CAPACITY};
pub use learning_time::LearningTimeTracker;
pub use progress::GameProgressStore;
