use thiserror::Error;
use types::InvalidChildId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing child identifier: {0}")]
    MissingChildId(#[from] InvalidChildId),

    #[error("Stored {namespace} data has schema version {found}, newest supported is {supported}")]
    UnsupportedSchema {
        namespace: String,
        found: u32,
        supported: u32,
    },

    #[error("Retry exhausted: {0}")]
    RetryExhausted(String),
}

impl DatabaseError {
    /// Missing ids are an expected fail-soft case rather than a storage fault.
    pub fn is_missing_child(&self) -> bool {
        matches!(self, DatabaseError::MissingChildId(_))
    }
}
