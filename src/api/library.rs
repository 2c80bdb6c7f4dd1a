// Library browsing and rescan endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::library::{episode_count, get_series_cards, ScanStats, Season, SeriesCard};
use crate::services::progress;
use crate::AppState;

use super::user_id;

/// Routes for /api/series
pub fn series_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_series))
        .route("/:name", get(get_series))
}

/// Routes for /api/library
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/refresh", post(refresh_library))
        .route("/status", get(library_status))
}

#[derive(Debug, Serialize)]
pub struct SeriesDetail {
    pub name: String,
    pub poster: Option<String>,
    pub seasons: Vec<Season>,
    /// Episode the user watched most recently in this series
    pub last_watched_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibraryStatus {
    pub media_root: String,
    pub series: usize,
    pub episodes: usize,
    pub last_scan: Option<ScanStats>,
}

/// GET /api/series - Name-sorted series cards
async fn list_series(State(state): State<Arc<AppState>>) -> Json<Vec<SeriesCard>> {
    Json(get_series_cards(&state.library.snapshot()))
}

/// GET /api/series/:name - Seasons and episodes of one series
async fn get_series(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<SeriesDetail>, (StatusCode, String)> {
    let library = state.library.snapshot();
    let series = library
        .get(&name)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Series not found".to_string()))?;

    let last_watched_path = progress::last_watched_in_series(&state.db, &user_id(&headers), &name)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(SeriesDetail {
        name,
        poster: series.poster.clone(),
        seasons: series.seasons.clone(),
        last_watched_path,
    }))
}

/// POST /api/library/refresh - Rescan the media root and swap the snapshot
async fn refresh_library(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanStats>, (StatusCode, String)> {
    tracing::info!("Library refresh requested");
    state.library.refresh().await.map(Json).map_err(|e| {
        tracing::error!("Library refresh failed: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
    })
}

/// GET /api/library/status
async fn library_status(State(state): State<Arc<AppState>>) -> Json<LibraryStatus> {
    let library = state.library.snapshot();
    Json(LibraryStatus {
        media_root: state.library.media_root().display().to_string(),
        series: library.len(),
        episodes: episode_count(&library),
        last_scan: state.library.last_scan(),
    })
}
