use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchRecord {
    pub user_id: String,
    pub relative_path: String,
    pub series_name: String,
    pub episode_name: String,
    /// RFC 3339 timestamp
    pub last_watched: String,
}

/// Entry of the "continue watching" row on the home screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinueItem {
    pub relative_path: String,
    pub series_name: String,
    pub episode_name: String,
    pub poster: Option<String>,
    /// Episode after this one in the series, across season boundaries
    pub next_path: Option<String>,
    pub last_watched: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EpisodeDescription {
    pub series_name: String,
    pub season_name: String,
    pub episode_number: i64,
    pub description: String,
    pub created_at: String,
}
