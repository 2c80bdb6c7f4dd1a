use std::path::Path;

use super::IMAGE_EXTENSIONS;

/// Look for an image next to a video sharing its stem ("S01E01.mkv" -> "S01E01.jpg").
///
/// Extensions are tried in [`IMAGE_EXTENSIONS`] order and the first existing
/// file wins. The result is relative to the media root:
/// `series/season/image` or `series/image` when there is no season folder.
pub fn find_thumbnail(
    folder: &Path,
    video_name: &str,
    series_name: &str,
    season_name: Option<&str>,
) -> Option<String> {
    let stem = Path::new(video_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(video_name);

    IMAGE_EXTENSIONS.iter().find_map(|ext| {
        let candidate = format!("{}{}", stem, ext);
        if !folder.join(&candidate).exists() {
            return None;
        }
        Some(match season_name {
            Some(season) => format!("{}/{}/{}", series_name, season, candidate),
            None => format!("{}/{}", series_name, candidate),
        })
    })
}
