use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::ordinal::ordinal_cmp;
use super::thumbnail::find_thumbnail;
use super::{
    has_extension, Episode, Library, Season, Series, IMAGE_EXTENSIONS, LOOSE_SEASON_NAME,
    VIDEO_EXTENSIONS,
};

/// What to do when a single directory entry cannot be read during a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryErrorPolicy {
    /// Log the entry, leave it out of the library and keep scanning
    #[default]
    Skip,
    /// Fail the whole scan on the first unreadable entry
    Abort,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", path.display())]
    Entry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of one scan
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub library: Library,
    /// Entries left out because they could not be read
    pub skipped_entries: usize,
}

/// One readable entry of a directory listing
#[derive(Debug)]
struct DirItem {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// Scan the media root into a fresh library snapshot.
///
/// Series are the root's subdirectories. Inside a series, subdirectories are
/// seasons and video files directly under the series folder are collected into
/// a synthetic [`LOOSE_SEASON_NAME`] season placed first. Seasons and episodes
/// are ordered by [`ordinal_cmp`]. Empty seasons and series are dropped.
///
/// A missing or unreadable root yields an empty library under either policy.
pub fn scan_library(
    root: &Path,
    policy: EntryErrorPolicy,
) -> Result<ScanOutcome, ScanError> {
    let mut scan = Scan {
        policy,
        skipped: 0,
    };

    if !root.exists() {
        tracing::warn!("Media root does not exist: {}", root.display());
        return Ok(ScanOutcome::default());
    }

    let series_dirs = match list_dir(root) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Media root is not readable: {}: {}", root.display(), e);
            return Ok(ScanOutcome::default());
        }
    };

    let mut library = Library::new();

    for item in scan.collect(root, series_dirs)? {
        if !item.is_dir {
            continue;
        }

        match scan.series(&item)? {
            Some(series) => {
                tracing::debug!(
                    "Series '{}': {} seasons, {} episodes",
                    item.name,
                    series.seasons.len(),
                    series.episode_count()
                );
                library.insert(item.name, series);
            }
            None => tracing::debug!("Skipping '{}': no episodes found", item.name),
        }
    }

    Ok(ScanOutcome {
        library,
        skipped_entries: scan.skipped,
    })
}

struct Scan {
    policy: EntryErrorPolicy,
    skipped: usize,
}

impl Scan {
    /// Apply the entry error policy to a failed read. `Ok(None)` means skipped.
    fn recover<T>(&mut self, path: &Path, result: io::Result<T>) -> Result<Option<T>, ScanError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(source) => match self.policy {
                EntryErrorPolicy::Skip => {
                    tracing::warn!("Skipping unreadable entry {}: {}", path.display(), source);
                    self.skipped += 1;
                    Ok(None)
                }
                EntryErrorPolicy::Abort => Err(ScanError::Entry {
                    path: path.to_path_buf(),
                    source,
                }),
            },
        }
    }

    /// Keep readable entries of a listing, name-sorted
    fn collect(
        &mut self,
        dir: &Path,
        entries: Vec<io::Result<DirItem>>,
    ) -> Result<Vec<DirItem>, ScanError> {
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(item) = self.recover(dir, entry)? {
                items.push(item);
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn series(&mut self, dir: &DirItem) -> Result<Option<Series>, ScanError> {
        let Some(entries) = self.recover(&dir.path, list_dir(&dir.path))? else {
            return Ok(None);
        };
        let entries = self.collect(&dir.path, entries)?;
        let series_name = dir.name.as_str();

        let poster = entries
            .iter()
            .find(|item| !item.is_dir && is_poster(&item.name))
            .map(|item| format!("{}/{}", series_name, item.name));

        let mut season_dirs = Vec::new();
        let mut loose_files = Vec::new();
        for item in &entries {
            if item.is_dir {
                season_dirs.push(item);
            } else if has_extension(&item.name, VIDEO_EXTENSIONS) {
                loose_files.push(item.name.as_str());
            }
        }

        season_dirs.sort_by(|a, b| ordinal_cmp(&a.name, &b.name));

        let mut seasons = Vec::new();
        for season_dir in season_dirs {
            if let Some(season) = self.season(series_name, season_dir)? {
                seasons.push(season);
            }
        }

        if !loose_files.is_empty() {
            let episodes = build_episodes(&dir.path, series_name, None, loose_files);
            seasons.insert(
                0,
                Season {
                    name: LOOSE_SEASON_NAME.to_string(),
                    episodes,
                },
            );
        }

        if seasons.is_empty() {
            return Ok(None);
        }

        Ok(Some(Series { poster, seasons }))
    }

    fn season(&mut self, series_name: &str, dir: &DirItem) -> Result<Option<Season>, ScanError> {
        let Some(entries) = self.recover(&dir.path, list_dir(&dir.path))? else {
            return Ok(None);
        };
        let entries = self.collect(&dir.path, entries)?;

        let videos: Vec<&str> = entries
            .iter()
            .filter(|item| !item.is_dir && has_extension(&item.name, VIDEO_EXTENSIONS))
            .map(|item| item.name.as_str())
            .collect();

        if videos.is_empty() {
            return Ok(None);
        }

        Ok(Some(Season {
            name: dir.name.clone(),
            episodes: build_episodes(&dir.path, series_name, Some(&dir.name), videos),
        }))
    }
}

fn build_episodes(
    folder: &Path,
    series_name: &str,
    season_name: Option<&str>,
    mut filenames: Vec<&str>,
) -> Vec<Episode> {
    filenames.sort_by(|a, b| ordinal_cmp(a, b));
    filenames
        .into_iter()
        .map(|filename| {
            let relative_path = match season_name {
                Some(season) => format!("{}/{}/{}", series_name, season, filename),
                None => format!("{}/{}", series_name, filename),
            };
            Episode {
                filename: filename.to_string(),
                relative_path,
                thumb: find_thumbnail(folder, filename, series_name, season_name),
            }
        })
        .collect()
}

fn is_poster(name: &str) -> bool {
    name.to_lowercase().starts_with("poster") && has_extension(name, IMAGE_EXTENSIONS)
}

/// List a directory. The outer error is the directory itself being unreadable;
/// inner errors are individual entries.
fn list_dir(dir: &Path) -> io::Result<Vec<io::Result<DirItem>>> {
    Ok(fs::read_dir(dir)?
        .map(|entry| {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().into_string().map_err(|raw| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {:?}", raw),
                )
            })?;
            // Follows symlinks, so a dangling link surfaces as an entry error
            let is_dir = fs::metadata(&path)?.is_dir();
            Ok(DirItem { name, path, is_dir })
        })
        .collect())
}
