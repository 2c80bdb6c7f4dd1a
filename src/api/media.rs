// Raw file serving from the media root with single-range support

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::library::normalize_relative_path;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stream/*path", get(stream_file))
        .route("/media/*path", get(media_file))
}

/// GET /stream/*path - Video bytes
async fn stream_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let file_path = resolve_media_path(state.library.media_root(), &path)?;
    serve_file(file_path, &headers).await
}

/// GET /media/*path - Posters and thumbnails
async fn media_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let file_path = resolve_media_path(state.library.media_root(), &path)?;
    serve_file(file_path, &headers).await
}

/// Join a relative path onto the media root, refusing anything that could
/// leave it (`..`, absolute paths, drive prefixes)
fn resolve_media_path(
    root: &std::path::Path,
    relative_path: &str,
) -> Result<PathBuf, (StatusCode, String)> {
    let normalized = normalize_relative_path(relative_path);
    let mut resolved = root.to_path_buf();
    let mut depth = 0;

    for component in std::path::Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                tracing::warn!("Rejected media path: {}", relative_path);
                return Err((StatusCode::BAD_REQUEST, "Invalid path".to_string()));
            }
        }
    }

    if depth == 0 {
        return Err((StatusCode::BAD_REQUEST, "Invalid path".to_string()));
    }

    Ok(resolved)
}

/// Get the MIME type for a media file based on extension
fn get_content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Parse HTTP Range header (e.g., "bytes=0-1023", "bytes=1024-" or "bytes=-500")
fn parse_range_header(range_header: Option<&HeaderValue>, file_size: u64) -> Option<(u64, u64)> {
    let range = range_header?.to_str().ok()?.strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;

    if file_size == 0 {
        return None;
    }

    let start: u64 = if start.is_empty() {
        // Suffix range: "-500" means last 500 bytes
        let suffix_len: u64 = end.parse().ok()?;
        if suffix_len == 0 {
            return None;
        }
        file_size.saturating_sub(suffix_len)
    } else {
        start.parse().ok()?
    };

    let end: u64 = if end.is_empty() || range.starts_with('-') {
        file_size - 1
    } else {
        end.parse().ok()?
    };

    if start > end || start >= file_size {
        return None;
    }

    Some((start, end.min(file_size - 1)))
}

async fn serve_file(file_path: PathBuf, headers: &HeaderMap) -> Result<Response, (StatusCode, String)> {
    let file = File::open(&file_path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "File not found".to_string()))?;

    let metadata = file.metadata().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Cannot read file metadata: {}", e),
        )
    })?;

    if !metadata.is_file() {
        return Err((StatusCode::NOT_FOUND, "File not found".to_string()));
    }

    let file_size = metadata.len();
    let display_path = file_path.display().to_string();
    let content_type = get_content_type(&display_path);
    let range = parse_range_header(headers.get(header::RANGE), file_size);

    let response = match range {
        Some((start, end)) => {
            let length = end - start + 1;

            tracing::debug!(
                "Serving range {}-{}/{} for {}",
                start,
                end,
                file_size,
                display_path
            );

            let mut file = file;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Seek failed: {}", e),
                    )
                })?;

            let body = Body::from_stream(ReaderStream::new(file.take(length)));

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, length)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
        }
        None => {
            tracing::debug!("Serving full file {} ({} bytes)", display_path, file_size);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, file_size)
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(ReaderStream::new(file)))
        }
    };

    response.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_bytes, send, state};
    use super::*;
    use axum::http::Request;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_rejects_escapes() {
        let root = std::path::Path::new("/srv/media");
        assert_eq!(
            resolve_media_path(root, "Show/S1/ep.mp4").unwrap(),
            PathBuf::from("/srv/media/Show/S1/ep.mp4")
        );
        assert_eq!(
            resolve_media_path(root, "Show\\S1\\ep.mp4").unwrap(),
            PathBuf::from("/srv/media/Show/S1/ep.mp4")
        );
        for bad in ["../etc/passwd", "Show/../../x", "/etc/passwd", "", "."] {
            let err = resolve_media_path(root, bad).unwrap_err();
            assert_eq!(err.0, StatusCode::BAD_REQUEST, "{}", bad);
        }
    }

    #[test]
    fn test_parse_range_header() {
        let hv = |s: &'static str| HeaderValue::from_static(s);
        assert_eq!(parse_range_header(Some(&hv("bytes=0-3")), 10), Some((0, 3)));
        assert_eq!(parse_range_header(Some(&hv("bytes=4-")), 10), Some((4, 9)));
        assert_eq!(parse_range_header(Some(&hv("bytes=-3")), 10), Some((7, 9)));
        assert_eq!(parse_range_header(Some(&hv("bytes=5-100")), 10), Some((5, 9)));
        assert_eq!(parse_range_header(Some(&hv("bytes=10-")), 10), None);
        assert_eq!(parse_range_header(Some(&hv("bytes=5-2")), 10), None);
        assert_eq!(parse_range_header(Some(&hv("items=0-1")), 10), None);
        assert_eq!(parse_range_header(Some(&hv("bytes=0-1")), 0), None);
        assert_eq!(parse_range_header(None, 10), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(get_content_type("a/b.MKV"), "video/x-matroska");
        assert_eq!(get_content_type("poster.jpeg"), "image/jpeg");
        assert_eq!(get_content_type("x.bin"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_stream_full_and_range() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let full = send(
            state.clone(),
            Request::get("/stream/Show/Temporada%2001/E01.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(full.status(), StatusCode::OK);
        assert_eq!(full.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_bytes(full).await, b"0123456789");

        let partial = send(
            state,
            Request::get("/stream/Show/Temporada%2001/E01.mp4")
                .header(header::RANGE, "bytes=2-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(partial.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(partial.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(body_bytes(partial).await, b"2345");
    }

    #[tokio::test]
    async fn test_media_poster_and_missing_file() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let poster = send(
            state.clone(),
            Request::get("/media/Show/poster.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(poster.status(), StatusCode::OK);
        assert_eq!(poster.headers()[header::CONTENT_TYPE], "image/jpeg");

        let missing = send(
            state.clone(),
            Request::get("/media/Show/nope.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let dir = send(
            state,
            Request::get("/media/Show").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(dir.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_escape_attempt_is_rejected() {
        let media = TempDir::new().unwrap();
        let state = state(&media).await;

        let response = send(
            state,
            Request::get("/stream/Show/..%2F..%2Fsecret")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
