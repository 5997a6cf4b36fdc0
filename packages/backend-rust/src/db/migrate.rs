use sqlx::SqlitePool;
use thiserror::Error;

/// Ordered migration files
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init_schema",
    include_str!("../../sql/001_init_schema.sql"),
)];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrationError> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await?;

    for &(name, sql) in MIGRATIONS {
        if applied.iter().any(|a| a == name) {
            tracing::debug!(migration = name, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in split_sql_statements(sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| MigrationError::Statement {
                    migration: name,
                    source,
                })?;
        }
        sqlx::query(r#"INSERT INTO "_migrations" ("name", "applied_at") VALUES (?, ?)"#)
            .bind(name)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(migration = name, "migration applied");
    }

    Ok(())
}

/// Split a script on `;`, ignoring quoted text and `--` comment lines.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for line in sql.lines() {
        if !in_single_quote && line.trim_start().starts_with("--") {
            continue;
        }

        for ch in line.chars() {
            match ch {
                '\'' if !in_double_quote => in_single_quote = !in_single_quote,
                '"' if !in_single_quote => in_double_quote = !in_double_quote,
                ';' if !in_single_quote && !in_double_quote => {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        statements.push(stmt.to_string());
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        current.push('\n');
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("migration {migration} failed: {source}")]
    Statement {
        migration: &'static str,
        #[source]
        source: sqlx::Error,
    },
}
