use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use thiserror::Error;

use crate::config::{env_bool, env_u32, env_u64};

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/masterly.db";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl DbConfig {
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Self {
            url,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5).max(1),
            acquire_timeout: Duration::from_millis(env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000)),
            busy_timeout: Duration::from_millis(env_u64("DB_BUSY_TIMEOUT_MS", 5000)),
            foreign_keys: env_bool("SQLITE_FOREIGN_KEYS", true),
        }
    }

    /// Config for a database file at `path`, used by tests and tooling.
    pub fn for_path(path: &Path) -> Self {
        Self {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }

    pub fn connect_options(&self) -> Result<SqliteConnectOptions, DbConfigError> {
        if !self.url.starts_with("sqlite:") {
            return Err(DbConfigError::UnsupportedUrl {
                url: self.url.clone(),
            });
        }

        if let Some(parent) = self.file_path().as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| DbConfigError::DataDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|err| DbConfigError::Invalid(err.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .foreign_keys(self.foreign_keys);

        Ok(options)
    }

    fn file_path(&self) -> Option<PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.starts_with(":memory:") {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("unsupported database url `{url}`: expected sqlite:")]
    UnsupportedUrl { url: String },
    #[error("invalid database url: {0}")]
    Invalid(String),
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
