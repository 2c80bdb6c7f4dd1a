// Media library indexer and episode-identity resolver
//
// A Library is built wholesale by one scan of the media root and never mutated
// afterwards. Every episode is keyed by its relative path ("series/[season/]file"),
// which progress tracking, streaming and navigation all share.

use serde::Serialize;
use std::collections::HashMap;

mod cache;
mod locate;
mod navigate;
mod ordinal;
mod scanner;
mod thumbnail;

pub use cache::{LibraryCache, ScanStats};
pub use locate::{locate_episode, normalize_relative_path, EpisodeInfo};
pub use navigate::{adjacent_episodes, next_episode};
pub use scanner::EntryErrorPolicy;

/// Video file extensions recognized by the scanner (lowercase, with dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".avi", ".mov", ".wmv"];

/// Image extensions for posters and thumbnails, in lookup priority order
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Name of the synthetic season holding videos placed directly in a series folder
pub const LOOSE_SEASON_NAME: &str = "Episódios";

/// Series name -> Series. Iteration order is unspecified; use
/// [`get_series_cards`] for a name-sorted view.
pub type Library = HashMap<String, Series>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    /// Relative path of the poster image, if any
    pub poster: Option<String>,
    /// Seasons in presentation order, never empty
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Season {
    pub name: String,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    /// Basename with extension
    pub filename: String,
    /// Unique key within a Library
    pub relative_path: String,
    /// Relative path of the same-stem image, if any
    pub thumb: Option<String>,
}

impl Series {
    /// All episodes in presentation order (season order, then episode order)
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons.iter().flat_map(|s| s.episodes.iter())
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

/// Card shown on the home screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesCard {
    pub name: String,
    pub poster: Option<String>,
}

/// Name-sorted list of series cards
pub fn get_series_cards(library: &Library) -> Vec<SeriesCard> {
    let mut cards: Vec<SeriesCard> = library
        .iter()
        .map(|(name, series)| SeriesCard {
            name: name.clone(),
            poster: series.poster.clone(),
        })
        .collect();
    cards.sort_by(|a, b| a.name.cmp(&b.name));
    cards
}

/// Total number of episodes across every series
pub fn episode_count(library: &Library) -> usize {
    library.values().map(Series::episode_count).sum()
}

/// Case-insensitive suffix check against one of the extension sets
pub(crate) fn has_extension(name: &str, extensions: &[&str]) -> bool {
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn episode(relative_path: &str) -> Episode {
        Episode {
            filename: relative_path
                .rsplit('/')
                .next()
                .unwrap_or(relative_path)
                .to_string(),
            relative_path: relative_path.to_string(),
            thumb: None,
        }
    }

    pub fn season(name: &str, paths: &[&str]) -> Season {
        Season {
            name: name.to_string(),
            episodes: paths.iter().map(|p| episode(p)).collect(),
        }
    }

    /// Show/S1: [e1, e2], Show/S2: [e3]
    pub fn two_season_library() -> Library {
        let mut library = Library::new();
        library.insert(
            "Show".to_string(),
            Series {
                poster: Some("Show/poster.jpg".to_string()),
                seasons: vec![
                    season("S1", &["Show/S1/e1.mp4", "Show/S1/e2.mp4"]),
                    season("S2", &["Show/S2/e3.mp4"]),
                ],
            },
        );
        library
    }
}
