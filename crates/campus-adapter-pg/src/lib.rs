//! Postgres-backed person and record stores.
//!
//! Every person mutation runs in its own transaction so a row and its
//! association set land together. Student inserts lock the class row and
//! re-count its students before inserting.

use campus_core::UpstreamConfig;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

mod error;
mod person;
mod records;

pub use error::{UNIQUE_CONSTRAINTS, map_sqlx_error, unique_target};

#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    /// Connect with pool settings from `config`.
    pub async fn connect(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
            .connect(&config.connection_string())
            .await?;
        tracing::debug!(
            max_connections = config.pool.max_connections,
            "Connected to Postgres"
        );
        Ok(Self { pool })
    }

    /// Connect to a URL with default pool settings.
    pub async fn connect_url(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}
