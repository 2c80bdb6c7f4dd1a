use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Open the SQLite pool with WAL mode and per-connection PRAGMAs
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true)
        // WAL lets streaming requests read while progress is being written
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL sync is safe with WAL and much faster
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                use sqlx::Executor;
                // Cache size: -8000 = 8MB (negative = KB)
                conn.execute("PRAGMA cache_size = -8000").await?;
                conn.execute("PRAGMA temp_store = MEMORY").await?;
                Ok(())
            })
        })
        .connect_with(connect_options)
        .await
        .context("Failed to open database")?;

    tracing::info!("SQLite configured: WAL mode, 8MB cache (per connection)");

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        -- Continue watching: one row per user and episode
        CREATE TABLE IF NOT EXISTS watch_progress (
            user_id TEXT NOT NULL,
            relative_path TEXT NOT NULL,
            series_name TEXT NOT NULL,
            episode_name TEXT NOT NULL,
            last_watched TEXT NOT NULL,
            PRIMARY KEY (user_id, relative_path)
        );

        -- Generated episode descriptions (fallback text is never stored)
        CREATE TABLE IF NOT EXISTS episode_descriptions (
            series_name TEXT NOT NULL,
            season_name TEXT NOT NULL,
            episode_number INTEGER NOT NULL,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (series_name, season_name, episode_number)
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create tables")?;

    create_indexes(pool).await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = [
        // Continue watching: newest first per user
        "CREATE INDEX IF NOT EXISTS idx_watch_progress_user_time ON watch_progress(user_id, last_watched DESC)",
        // Series page: last watched episode of one series
        "CREATE INDEX IF NOT EXISTS idx_watch_progress_user_series ON watch_progress(user_id, series_name)",
    ];

    for sql in indexes {
        if let Err(e) = sqlx::query(sql).execute(pool).await {
            tracing::warn!("Failed to create index: {} - {}", sql, e);
        }
    }

    Ok(())
}

/// Single-connection in-memory database with the schema applied
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
