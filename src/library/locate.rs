use serde::Serialize;

use super::Library;

/// Where an episode sits in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeInfo {
    pub series_name: String,
    pub episode_name: String,
    pub season_name: String,
    /// 1-based position within its season
    pub episode_index: usize,
}

/// Turn backslashes into forward slashes
pub fn normalize_relative_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve a relative path to its series, season and position.
///
/// Relative paths always start with the series folder name, so only that
/// series is searched.
pub fn locate_episode(library: &Library, relative_path: &str) -> Option<EpisodeInfo> {
    let path = normalize_relative_path(relative_path);
    let (series_name, _) = path.split_once('/')?;
    let series = library.get(series_name)?;

    series.seasons.iter().find_map(|season| {
        season
            .episodes
            .iter()
            .position(|ep| ep.relative_path == path)
            .map(|idx| EpisodeInfo {
                series_name: series_name.to_string(),
                episode_name: season.episodes[idx].filename.clone(),
                season_name: season.name.clone(),
                episode_index: idx + 1,
            })
    })
}
