// Episode lookup by relative path: identity, neighbours and description

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::library::{adjacent_episodes, locate_episode, normalize_relative_path, EpisodeInfo};
use crate::services::progress;
use crate::AppState;

use super::user_id;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/watch/*path", post(watch_episode))
        .route("/episode/*path", get(get_episode))
}

#[derive(Debug, Serialize)]
pub struct EpisodeResponse {
    pub relative_path: String,
    pub series_name: String,
    pub season_name: String,
    /// 1-based position within the season
    pub episode_index: usize,
    pub episode_name: String,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub description: Option<String>,
}

/// POST /api/watch/*path - Open an episode and record it for "continue watching"
async fn watch_episode(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<Json<EpisodeResponse>, (StatusCode, String)> {
    let user = user_id(&headers);
    let (info, response) = resolve_episode(&state, &path).await?;

    progress::record_watch(&state.db, &user, &response.relative_path, &info)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!("Watching: user={}, path={}", user, response.relative_path);

    Ok(Json(response))
}

/// GET /api/episode/*path - Episode info without touching progress
async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<EpisodeResponse>, (StatusCode, String)> {
    resolve_episode(&state, &path)
        .await
        .map(|(_, response)| Json(response))
}

async fn resolve_episode(
    state: &AppState,
    path: &str,
) -> Result<(EpisodeInfo, EpisodeResponse), (StatusCode, String)> {
    let relative_path = normalize_relative_path(path);
    let library = state.library.snapshot();

    let info = locate_episode(&library, &relative_path)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Episode not found".to_string()))?;
    let adjacent = adjacent_episodes(&library, &info.series_name, &relative_path);

    let description = match state.descriptions {
        Some(ref service) => Some(
            service
                .describe(
                    &info.series_name,
                    &info.season_name,
                    info.episode_index,
                    &info.episode_name,
                )
                .await,
        ),
        None => None,
    };

    let response = EpisodeResponse {
        relative_path,
        series_name: info.series_name.clone(),
        season_name: info.season_name.clone(),
        episode_index: info.episode_index,
        episode_name: info.episode_name.clone(),
        previous: adjacent.previous,
        next: adjacent.next,
        description,
    };

    Ok((info, response))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, send, state};
    use super::super::USER_HEADER;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_episode_lookup_with_neighbours() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let response = send(
            state,
            Request::get("/api/episode/Show/Temporada%2001/E02.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["series_name"], "Show");
        assert_eq!(json["season_name"], "Temporada 01");
        assert_eq!(json["episode_index"], 2);
        assert_eq!(json["episode_name"], "E02.mp4");
        assert_eq!(json["previous"], "Show/Temporada 01/E01.mp4");
        assert_eq!(json["next"], "Show/Temporada 02/E03.mp4");
        assert_eq!(
            json["description"],
            "Episódio 2 da série Show: \"E02\"."
        );
    }

    #[tokio::test]
    async fn test_watch_records_progress() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let response = send(
            state.clone(),
            Request::post("/api/watch/Show/Temporada%2002/E03.mp4")
                .header(USER_HEADER, "ana")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["next"].is_null());

        let detail = send(
            state.clone(),
            Request::get("/api/series/Show")
                .header(USER_HEADER, "ana")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let json = body_json(detail).await;
        assert_eq!(json["last_watched_path"], "Show/Temporada 02/E03.mp4");

        // Another user has no progress
        let detail = send(
            state,
            Request::get("/api/series/Show").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(body_json(detail).await["last_watched_path"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_episode_is_404() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let response = send(
            state,
            Request::post("/api/watch/Show/Temporada%2001/E99.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
