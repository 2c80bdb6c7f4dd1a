use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod db;
mod library;
mod models;
mod services;

use config::AppConfig;
use library::LibraryCache;
use services::descriptions::DescriptionService;
use services::gemini::GeminiClient;

/// Tracks all background task handles for graceful shutdown
struct BackgroundTasks {
    handles: Vec<(&'static str, JoinHandle<()>)>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    fn new() -> Self {
        Self {
            handles: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.handles.push((name, handle));
    }

    async fn shutdown(self) {
        tracing::info!("Initiating graceful shutdown...");

        self.shutdown.cancel();

        for (name, handle) in self.handles {
            tracing::debug!("Waiting for {} to finish...", name);
            match tokio::time::timeout(Duration::from_secs(10), handle).await {
                Ok(Ok(())) => tracing::debug!("{} finished cleanly", name),
                Ok(Err(e)) => tracing::warn!("{} panicked: {}", name, e),
                Err(_) => tracing::warn!("{} timed out during shutdown", name),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub library: LibraryCache,
    /// None when descriptions are switched off in config
    pub descriptions: Option<DescriptionService>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metflix=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load();

    config.paths.ensure_dirs().await?;

    config.log_config();

    let database_url = config.database_url();
    tracing::debug!("Database URL: {}", database_url);

    let pool = db::connect(&database_url).await?;
    db::migrate(&pool).await?;

    let descriptions = config.descriptions_enabled.then(|| {
        let generator = config
            .gemini_api_key
            .clone()
            .map(|key| GeminiClient::new(key, config.gemini_model.clone()));
        DescriptionService::new(pool.clone(), generator)
    });

    let state = Arc::new(AppState {
        db: pool.clone(),
        library: LibraryCache::new(config.media_root.clone(), config.scanner.entry_errors),
        descriptions,
    });

    if config.scanner.scan_on_startup {
        tracing::info!("Running startup scan of {}", config.media_root.display());
        match state.library.refresh().await {
            Ok(stats) => tracing::info!(
                "Startup scan: {} series, {} episodes ({} skipped) in {}ms",
                stats.series,
                stats.episodes,
                stats.skipped_entries,
                stats.duration_ms
            ),
            Err(e) => tracing::error!("Startup scan failed: {:#}", e),
        }
    }

    let mut bg_tasks = BackgroundTasks::new();
    let shutdown_token = bg_tasks.token();

    if config.scanner.rescan_interval_minutes > 0 {
        let rescan_state = state.clone();
        let cancel = shutdown_token.clone();
        let interval = Duration::from_secs(config.scanner.rescan_interval_minutes * 60);

        bg_tasks.spawn("periodic-rescan", async move {
            tracing::info!(
                "Periodic rescan started (interval: {} minutes)",
                interval.as_secs() / 60
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Rescan task received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match rescan_state.library.refresh().await {
                            Ok(stats) => tracing::debug!(
                                "Periodic rescan: {} series, {} episodes",
                                stats.series,
                                stats.episodes
                            ),
                            Err(e) => tracing::error!("Periodic rescan failed: {:#}", e),
                        }
                    }
                }
            }
        });
    } else {
        tracing::info!("Periodic rescan disabled (interval set to 0)");
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address: {}:{}",
                config.bind_address, config.port
            )
        })?;
    tracing::info!("Starting server on {}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    bg_tasks.shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}
