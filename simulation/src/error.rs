use database::DatabaseError;
use thiserror::Error;
use types::GameSetupError;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Could not read config {path}: {source}")]
    ConfigIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Game setup failed: {0}")]
    Setup(#[from] GameSetupError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Gave up after {0} inputs without finishing")]
    MoveLimitReached(u32),
}
