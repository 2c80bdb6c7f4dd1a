// Continue-watching progress, keyed by (user, relative path)

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::library::{next_episode, EpisodeInfo, Library};
use crate::models::{ContinueItem, WatchRecord};

/// User id used when a request does not identify one
pub const DEFAULT_USER: &str = "default";

/// Record that `user_id` just opened an episode
pub async fn record_watch(
    pool: &SqlitePool,
    user_id: &str,
    relative_path: &str,
    info: &EpisodeInfo,
) -> Result<WatchRecord> {
    record_watch_at(pool, user_id, relative_path, info, Utc::now()).await
}

async fn record_watch_at(
    pool: &SqlitePool,
    user_id: &str,
    relative_path: &str,
    info: &EpisodeInfo,
    at: DateTime<Utc>,
) -> Result<WatchRecord> {
    // Fixed-width timestamps so text ordering matches time ordering
    let last_watched = at.to_rfc3339_opts(SecondsFormat::Micros, true);

    sqlx::query(
        r#"
        INSERT INTO watch_progress (user_id, relative_path, series_name, episode_name, last_watched)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, relative_path) DO UPDATE SET
            series_name = excluded.series_name,
            episode_name = excluded.episode_name,
            last_watched = excluded.last_watched
        "#,
    )
    .bind(user_id)
    .bind(relative_path)
    .bind(&info.series_name)
    .bind(&info.episode_name)
    .bind(&last_watched)
    .execute(pool)
    .await?;

    tracing::debug!(
        "Watch recorded: user={}, path={}, at={}",
        user_id,
        relative_path,
        last_watched
    );

    Ok(WatchRecord {
        user_id: user_id.to_string(),
        relative_path: relative_path.to_string(),
        series_name: info.series_name.clone(),
        episode_name: info.episode_name.clone(),
        last_watched,
    })
}

/// Most recent episode per series, newest first, with the series poster and
/// the episode to play next attached
pub async fn continue_watching(
    pool: &SqlitePool,
    user_id: &str,
    library: &Library,
) -> Result<Vec<ContinueItem>> {
    let records: Vec<WatchRecord> = sqlx::query_as(
        "SELECT * FROM watch_progress WHERE user_id = ? ORDER BY last_watched DESC, relative_path",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut seen_series = HashSet::new();
    let items = records
        .into_iter()
        .filter(|r| seen_series.insert(r.series_name.clone()))
        .map(|r| ContinueItem {
            poster: library
                .get(&r.series_name)
                .and_then(|s| s.poster.clone()),
            next_path: next_episode(library, &r.series_name, &r.relative_path),
            relative_path: r.relative_path,
            series_name: r.series_name,
            episode_name: r.episode_name,
            last_watched: r.last_watched,
        })
        .collect();

    Ok(items)
}

/// Relative path of the latest watched episode of a series
pub async fn last_watched_in_series(
    pool: &SqlitePool,
    user_id: &str,
    series_name: &str,
) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"SELECT relative_path FROM watch_progress
           WHERE user_id = ? AND series_name = ?
           ORDER BY last_watched DESC
           LIMIT 1"#,
    )
    .bind(user_id)
    .bind(series_name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(path,)| path))
}
