// Configuration module for metflix
// Handles XDG-compliant directory paths and TOML configuration file

use serde::Deserialize;
use std::path::PathBuf;

use crate::library::EntryErrorPolicy;

const APP_NAME: &str = "metflix";
const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerConfig,

    /// Directory paths (overrides XDG defaults)
    pub paths: PathsConfig,

    /// Media library location
    pub library: LibraryConfig,

    /// Scanner/library refresh configuration
    pub scanner: ScannerConfig,

    /// AI episode description configuration
    pub descriptions: DescriptionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 5000)
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Override data directory (database location)
    pub data_dir: Option<PathBuf>,

    /// Override config directory
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root folder holding one subfolder per series (default: ./media)
    pub media_root: Option<PathBuf>,
}

/// Scanner/library refresh configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scan the media root when the server starts (default: true)
    pub scan_on_startup: bool,

    /// Rescan interval in minutes (default: 0, disabled)
    pub rescan_interval_minutes: u64,

    /// What to do with unreadable entries: "skip" (default) or "abort"
    pub entry_errors: EntryErrorPolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_on_startup: true,
            rescan_interval_minutes: 0,
            entry_errors: EntryErrorPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DescriptionsConfig {
    /// Generate episode descriptions (default: true, needs an API key)
    pub enabled: bool,

    /// Gemini API key (optional)
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    pub gemini_model: String,
}

impl Default for DescriptionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Application paths following XDG Base Directory Specification on Unix
/// On other platforms, falls back to the current directory or platform-specific locations
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for configuration files (config.toml)
    /// XDG: $XDG_CONFIG_HOME/metflix or ~/.config/metflix
    pub config_dir: PathBuf,

    /// Directory for persistent data (database)
    /// XDG: $XDG_DATA_HOME/metflix or ~/.local/share/metflix
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Create application paths using XDG directories (or fallbacks)
    ///
    /// Priority order:
    /// 1. Environment variables (METFLIX_CONFIG_DIR, METFLIX_DATA_DIR)
    /// 2. Config file overrides
    /// 3. XDG/platform directories
    /// 4. Current directory fallback
    pub fn new(config_overrides: &PathsConfig) -> Self {
        Self {
            config_dir: Self::resolve_dir(
                "METFLIX_CONFIG_DIR",
                &config_overrides.config_dir,
                dirs::config_dir(),
                None,
            ),
            data_dir: Self::resolve_dir(
                "METFLIX_DATA_DIR",
                &config_overrides.data_dir,
                dirs::data_dir(),
                Some("data"),
            ),
        }
    }

    /// Create application paths using current directory (portable mode)
    pub fn current_dir() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            config_dir: cwd.clone(),
            data_dir: cwd.join("data"),
        }
    }

    fn resolve_dir(
        env_var: &str,
        config_override: &Option<PathBuf>,
        platform_dir: Option<PathBuf>,
        cwd_subdir: Option<&str>,
    ) -> PathBuf {
        if let Ok(path) = std::env::var(env_var) {
            return PathBuf::from(path);
        }

        if let Some(ref path) = config_override {
            return path.clone();
        }

        if let Some(dir) = platform_dir {
            return dir.join(APP_NAME);
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match cwd_subdir {
            Some(sub) => cwd.join(sub),
            None => cwd,
        }
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("metflix.db")
    }

    /// Get the database URL for SQLite
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path().display())
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILENAME)
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    /// Log the configured paths
    pub fn log_paths(&self) {
        tracing::info!("Configuration directory: {}", self.config_dir.display());
        tracing::debug!("Config file: {}", self.config_file_path().display());
        tracing::info!("Data directory: {}", self.data_dir.display());
        tracing::debug!("Database path: {}", self.database_path().display());
    }
}

/// Application configuration - combines TOML file with environment overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application paths
    pub paths: AppPaths,

    /// Server port
    pub port: u16,

    /// Bind address
    pub bind_address: String,

    /// Root folder of the media library
    pub media_root: PathBuf,

    /// Scanner configuration
    pub scanner: ScannerConfig,

    /// Whether AI descriptions are requested at all
    pub descriptions_enabled: bool,

    /// Gemini API key (optional)
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    pub gemini_model: String,
}

impl AppConfig {
    /// Load configuration from TOML file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        let portable_mode = std::env::var("METFLIX_PORTABLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let config_file = if portable_mode {
            tracing::info!("Running in portable mode (using current directory)");
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self::load_config_file(&cwd)
        } else {
            Self::load_config_file(&Self::find_config_dir())
        };

        let paths = if portable_mode {
            AppPaths::current_dir()
        } else {
            AppPaths::new(&config_file.paths)
        };

        Self::build(config_file, paths)
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("METFLIX_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &std::path::Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from config file with environment overrides
    fn build(config_file: ConfigFile, paths: AppPaths) -> Self {
        // Port: env > config > default
        let port = std::env::var("METFLIX_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(config_file.server.port);

        // Bind address: env > config > default
        let bind_address = std::env::var("METFLIX_BIND_ADDRESS")
            .unwrap_or_else(|_| config_file.server.bind_address.clone());

        // Media root: env > config > ./media
        let media_root = std::env::var("MEDIA_ROOT")
            .ok()
            .map(PathBuf::from)
            .or(config_file.library.media_root)
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join("media")
            });

        // Gemini API key: env > config
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or(config_file.descriptions.gemini_api_key);

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or(config_file.descriptions.gemini_model);

        Self {
            paths,
            port,
            bind_address,
            media_root,
            scanner: config_file.scanner,
            descriptions_enabled: config_file.descriptions.enabled,
            gemini_api_key,
            gemini_model,
        }
    }

    /// Get the database URL, with override from DATABASE_URL env var
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.paths.database_url())
    }

    /// Log configuration status
    pub fn log_config(&self) {
        self.paths.log_paths();
        tracing::info!("Media root: {}", self.media_root.display());
        tracing::info!("Server listening on {}:{}", self.bind_address, self.port);

        if !self.descriptions_enabled {
            tracing::info!("Episode descriptions: disabled");
        } else if self.gemini_api_key.is_some() {
            tracing::info!("Episode descriptions: Gemini ({})", self.gemini_model);
        } else {
            tracing::info!("Episode descriptions: fallback text only");
            tracing::info!("Hint: set GEMINI_API_KEY or descriptions.gemini_api_key in config.toml");
        }

        if self.scanner.rescan_interval_minutes > 0 {
            tracing::info!(
                "Periodic rescan every {} minutes",
                self.scanner.rescan_interval_minutes
            );
        } else {
            tracing::debug!("Periodic rescan: disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_dir_paths() {
        let paths = AppPaths::current_dir();
        assert!(paths.data_dir.ends_with("data"));
        assert!(paths.config_file_path().ends_with(CONFIG_FILENAME));
    }

    #[test]
    fn test_database_url_format() {
        let paths = AppPaths::current_dir();
        let url = paths.database_url();
        assert!(url.starts_with("sqlite:"));
        assert!(url.ends_with("metflix.db?mode=rwc"));
    }

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(config.scanner.scan_on_startup);
        assert_eq!(config.scanner.rescan_interval_minutes, 0);
        assert_eq!(config.scanner.entry_errors, EntryErrorPolicy::Skip);
        assert!(config.descriptions.enabled);
        assert_eq!(config.descriptions.gemini_model, "gemini-1.5-flash");
        assert!(config.library.media_root.is_none());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[server]
port = 9000
bind_address = "127.0.0.1"

[library]
media_root = "/srv/media"

[scanner]
rescan_interval_minutes = 30
entry_errors = "abort"

[descriptions]
gemini_api_key = "test_key"
gemini_model = "gemini-2.0-flash"

[paths]
data_dir = "/custom/data"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.library.media_root, Some(PathBuf::from("/srv/media")));
        assert_eq!(config.scanner.rescan_interval_minutes, 30);
        assert_eq!(config.scanner.entry_errors, EntryErrorPolicy::Abort);
        assert!(config.scanner.scan_on_startup);
        assert_eq!(
            config.descriptions.gemini_api_key,
            Some("test_key".to_string())
        );
        assert_eq!(config.descriptions.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.paths.data_dir, Some(PathBuf::from("/custom/data")));
    }

    #[test]
    fn test_paths_without_cache_dir() {
        // Older config files may still carry a cache_dir entry
        let toml_str = r#"
[paths]
data_dir = "/custom/data"
cache_dir = "/custom/cache"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.paths.data_dir, Some(PathBuf::from("/custom/data")));

        let paths = AppPaths::current_dir();
        assert!(paths.data_dir.ends_with("data"));
        assert!(paths.database_path().starts_with(&paths.data_dir));
    }

    #[test]
    fn test_partial_config_toml() {
        let toml_str = r#"
[descriptions]
enabled = false
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 5000); // default
        assert!(!config.descriptions.enabled); // from file
        assert_eq!(config.descriptions.gemini_model, "gemini-1.5-flash");
    }
}
