use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

use super::scanner::{scan_library, EntryErrorPolicy};
use super::{episode_count, Library};

/// Summary of the last completed scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub series: usize,
    pub episodes: usize,
    pub skipped_entries: usize,
    pub duration_ms: u64,
    pub finished_at: String,
}

/// Holds the current library snapshot.
///
/// Readers clone the `Arc` and keep using it for as long as they like; a
/// refresh builds a new library and swaps the pointer, it never touches the
/// old one. Only one refresh runs at a time.
pub struct LibraryCache {
    media_root: PathBuf,
    policy: EntryErrorPolicy,
    current: RwLock<Arc<Library>>,
    last_scan: RwLock<Option<ScanStats>>,
    scan_lock: Mutex<()>,
}

impl LibraryCache {
    /// Create an empty cache; call [`LibraryCache::refresh`] to populate it
    pub fn new(media_root: PathBuf, policy: EntryErrorPolicy) -> Self {
        Self {
            media_root,
            policy,
            current: RwLock::new(Arc::new(Library::new())),
            last_scan: RwLock::new(None),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<Library> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_scan(&self) -> Option<ScanStats> {
        self.last_scan
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rescan the media root and publish the result.
    ///
    /// The walk runs on the blocking pool. A concurrent call waits for the
    /// running scan and then scans again. On error the previous snapshot stays.
    pub async fn refresh(&self) -> Result<ScanStats> {
        let _guard = self.scan_lock.lock().await;

        tracing::info!("Scanning media root: {}", self.media_root.display());
        let started = Instant::now();

        let root = self.media_root.clone();
        let policy = self.policy;
        let outcome = tokio::task::spawn_blocking(move || scan_library(&root, policy))
            .await
            .context("Scan task join error")?
            .context("Library scan aborted")?;

        let stats = ScanStats {
            series: outcome.library.len(),
            episodes: episode_count(&outcome.library),
            skipped_entries: outcome.skipped_entries,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: chrono::Utc::now().to_rfc3339(),
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(outcome.library);
        *self.last_scan.write().unwrap_or_else(PoisonError::into_inner) = Some(stats.clone());

        tracing::info!(
            "Scan complete: {} series, {} episodes, {} skipped entries in {}ms",
            stats.series,
            stats.episodes,
            stats.skipped_entries,
            stats.duration_ms
        );

        Ok(stats)
    }
}
