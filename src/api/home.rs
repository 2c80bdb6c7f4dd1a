// Home screen: continue watching

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use std::sync::Arc;

use crate::models::ContinueItem;
use crate::services::progress;
use crate::AppState;

use super::user_id;

/// Routes for /api/continue
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_continue_watching))
}

/// GET /api/continue - Latest episode per series, newest first
async fn get_continue_watching(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ContinueItem>>, (StatusCode, String)> {
    let library = state.library.snapshot();
    progress::continue_watching(&state.db, &user_id(&headers), &library)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
