use axum::{http::HeaderMap, Router};
use std::sync::Arc;

use crate::services::progress::DEFAULT_USER;
use crate::AppState;

mod home;
mod library;
mod media;
mod watch;

/// Header naming the profile whose progress is read and written
pub const USER_HEADER: &str = "x-user-id";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api/series", library::series_routes()) // Series cards and detail
        .nest("/api/library", library::routes()) // Rescan and scan status
        .nest("/api/continue", home::routes()) // Continue watching
        .nest("/api", watch::routes()) // Watch / episode lookup by relative path
        .merge(media::routes()) // Raw bytes under /stream and /media
}

/// User id from the request, or the shared default profile
pub(crate) fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_USER)
        .to_string()
}
