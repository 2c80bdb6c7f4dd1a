use serde::Serialize;

use super::Library;

/// Neighbours of an episode in its series' presentation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Adjacent {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Previous and next episode across season boundaries.
///
/// Seasons are flattened in their stored order, so the next episode after the
/// last of a season is the first of the following season. Unknown series or
/// paths give an empty [`Adjacent`].
pub fn adjacent_episodes(library: &Library, series_name: &str, relative_path: &str) -> Adjacent {
    let Some(series) = library.get(series_name) else {
        return Adjacent::default();
    };

    let episodes: Vec<&str> = series
        .episodes()
        .map(|ep| ep.relative_path.as_str())
        .collect();

    let Some(pos) = episodes.iter().position(|p| *p == relative_path) else {
        return Adjacent::default();
    };

    Adjacent {
        previous: pos
            .checked_sub(1)
            .map(|i| episodes[i].to_string()),
        next: episodes.get(pos + 1).map(|p| p.to_string()),
    }
}

/// Episode to play after `relative_path` ("continue watching -> play next")
pub fn next_episode(library: &Library, series_name: &str, relative_path: &str) -> Option<String> {
    adjacent_episodes(library, series_name, relative_path).next
}

#[cfg(test)]
mod tests {
    use super::super::test_support::two_season_library;
    use super::*;

    fn adj(previous: Option<&str>, next: Option<&str>) -> Adjacent {
        Adjacent {
            previous: previous.map(String::from),
            next: next.map(String::from),
        }
    }

    #[test]
    fn test_adjacency_across_seasons() {
        let library = two_season_library();
        assert_eq!(
            adjacent_episodes(&library, "Show", "Show/S1/e1.mp4"),
            adj(None, Some("Show/S1/e2.mp4"))
        );
        assert_eq!(
            adjacent_episodes(&library, "Show", "Show/S1/e2.mp4"),
            adj(Some("Show/S1/e1.mp4"), Some("Show/S2/e3.mp4"))
        );
        assert_eq!(
            adjacent_episodes(&library, "Show", "Show/S2/e3.mp4"),
            adj(Some("Show/S1/e2.mp4"), None)
        );
    }

    #[test]
    fn test_unknown_series_or_path() {
        let library = two_season_library();
        assert_eq!(
            adjacent_episodes(&library, "Other", "Show/S1/e1.mp4"),
            Adjacent::default()
        );
        assert_eq!(
            adjacent_episodes(&library, "Show", "Show/S9/e9.mp4"),
            Adjacent::default()
        );
    }

    #[test]
    fn test_next_episode() {
        let library = two_season_library();
        assert_eq!(
            next_episode(&library, "Show", "Show/S1/e2.mp4").as_deref(),
            Some("Show/S2/e3.mp4")
        );
        assert!(next_episode(&library, "Show", "Show/S2/e3.mp4").is_none());
    }
}
