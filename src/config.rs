use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub library: LibraryConfig,

    pub providers: ProviderConfig,

    pub cache: CacheConfig,

    pub poster: PosterConfig,

    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            event_bus_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub root_path: String,

    /// Process everything already on disk when the daemon starts.
    pub scan_on_start: bool,

    /// Re-fetch posters even when a fresh one is already in place.
    pub force_update: bool,

    /// Days before an existing poster is considered stale (default: 30).
    pub freshness_days: u64,

    /// Seconds within which a repeated trigger for the same folder is absorbed
    /// (default: 5). One file write can surface as several watcher events.
    pub reprocess_window_secs: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_path: "./media".to_string(),
            scan_on_start: true,
            force_update: false,
            freshness_days: 30,
            reprocess_window_secs: 5,
        }
    }
}

/// API keys for the keyed poster backends. An empty key means that backend is
/// skipped silently; AniList and TVmaze never need one.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub tmdb_api_key: String,

    pub omdb_api_key: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn tmdb_key(&self) -> Option<&str> {
        if self.tmdb_api_key.is_empty() {
            None
        } else {
            Some(&self.tmdb_api_key)
        }
    }

    #[must_use]
    pub fn omdb_key(&self) -> Option<&str> {
        if self.omdb_api_key.is_empty() {
            None
        } else {
            Some(&self.omdb_api_key)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,

    pub enabled: bool,

    /// Generate placeholder posters locally instead of calling any provider.
    pub mock_mode: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("iconarr");
        Self {
            dir: dir.to_string_lossy().to_string(),
            enabled: true,
            mock_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    /// Longest-side cap applied before caching or applying (default: 1024).
    pub max_dimension: u32,

    /// Filename written into each media unit's directory.
    pub filename: String,

    /// Embed the poster into movie files with ffmpeg. Disable on systems
    /// without ffmpeg; movies then keep only the poster file.
    pub embed_artwork: bool,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            filename: "poster.jpg".to_string(),
            embed_artwork: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period before a burst of events fires one processing trigger.
    pub debounce_secs: u64,

    /// Events accepted per rolling one-second window; the rest are dropped.
    pub max_events_per_second: usize,

    /// Worker tasks draining the processing queue (default: 3).
    pub max_workers: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_secs: 5,
            max_events_per_second: 10,
            max_workers: 3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("iconarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".iconarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Startup validation. Configuration problems are fatal here; once the
    /// watch loop is running the config is assumed stable.
    pub fn validate(&self) -> Result<()> {
        if self.library.root_path.is_empty() {
            anyhow::bail!("Library root path cannot be empty");
        }

        let root = Path::new(&self.library.root_path);
        if !root.is_dir() {
            anyhow::bail!("Library root does not exist: {}", root.display());
        }

        if self.watcher.debounce_secs == 0 {
            anyhow::bail!("Debounce interval must be at least 1 second");
        }

        if self.watcher.max_workers == 0 {
            anyhow::bail!("At least one worker is required");
        }

        if self.poster.max_dimension == 0 {
            anyhow::bail!("Poster max dimension must be > 0");
        }

        Ok(())
    }

    #[must_use]
    pub fn library_root(&self) -> PathBuf {
        PathBuf::from(&self.library.root_path)
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.dir)
    }
}
