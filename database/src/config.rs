use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::{retry::retry_with_backoff, stores::SqliteStore, DatabaseError};

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_POOL_SIZE: u32 = 5;
const CONNECT_RETRIES: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

impl DatabaseConfig {
    pub fn from_cli_or_env_or_yaml(cli_arg: Option<String>, yaml_config: Option<String>) -> Self {
        let url = if let Some(arg) = cli_arg {
            arg
        } else if let Ok(env) = std::env::var("DATABASE_URL") {
            env
        } else if let Some(yaml) = yaml_config {
            yaml
        } else {
            DEFAULT_DATABASE_URL.to_string()
        };

        Self {
            url,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }

    /// An in-memory database lives only as long as its connection, so it gets exactly
    /// one that is never closed for idleness or age.
    pub async fn create_pool(&self) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&self.url)?.create_if_missing(true);
        let pool_options = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(self.pool_size.max(1))
        };
        pool_options.connect_with(options).await
    }

    /// Opens the pool, retrying with backoff, and makes sure the table exists.
    pub async fn connect(&self) -> Result<SqliteStore, DatabaseError> {
        let config = self.clone();
        let pool = retry_with_backoff(
            "Opening database",
            move || {
                let config = config.clone();
                Box::pin(async move { config.create_pool().await })
            },
            CONNECT_RETRIES,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| DatabaseError::RetryExhausted(format!("{}: {}", self.url, e)))?;

        let store = SqliteStore::new(pool);
        store.run_migrations().await?;
        tracing::info!("Connected to {}", self.url);
        Ok(store)
    }
}
