pub mod config;
pub mod migrate;
pub mod operations;

use std::time::Instant;

use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};
use crate::db::migrate::MigrationError;

#[derive(Clone)]
pub struct Database {
    config: DbConfig,
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    pub pool_size: u32,
    pub idle_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Database {
    pub async fn from_env() -> Result<Self, DbInitError> {
        Self::connect(DbConfig::from_env()).await
    }

    pub async fn connect(config: DbConfig) -> Result<Self, DbInitError> {
        let options = config.connect_options()?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(DbInitError::Sqlx)?;

        tracing::info!(url = %config.url, max_connections = config.max_connections, "sqlite pool ready");

        Ok(Self { config, pool })
    }

    pub async fn migrate(&self) -> Result<(), DbInitError> {
        migrate::run_migrations(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub async fn health_check(&self) -> DatabaseHealth {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        DatabaseHealth {
            healthy: result.is_ok(),
            latency_ms,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
            error: result.err().map(|err| err.to_string()),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("database config error: {0}")]
    Config(#[from] DbConfigError),
    #[error("database connection error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("database migration error: {0}")]
    Migration(#[from] MigrationError),
}
