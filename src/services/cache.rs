use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const INDEX_FILE: &str = "api_cache.json";

/// Kind tag baked into cache keys so the same title can carry different
/// posters per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTag {
    Movie,
    Tv,
    Anime,
}

impl KindTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Anime => "anime",
        }
    }
}

#[must_use]
pub fn cache_key(title: &str, kind: KindTag) -> String {
    let sanitized: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("poster_{}_{}", sanitized, kind.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    filename: String,
    cached_at: DateTime<Utc>,
}

/// On-disk poster cache: one JPEG file per entry plus a flat JSON index
/// holding filenames and timestamps. Index writes go through a temp file
/// and rename so a crash never leaves a truncated index behind.
pub struct PosterCache {
    dir: PathBuf,
    index_path: PathBuf,
    index: Mutex<HashMap<String, CacheEntry>>,
}

impl PosterCache {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;

        let index_path = dir.join(INDEX_FILE);
        let index = match fs::read_to_string(&index_path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "Corrupt cache index, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            dir,
            index_path,
            index: Mutex::new(index),
        })
    }

    /// Returns the cached poster path when the entry is younger than
    /// `freshness_days` and its file still exists on disk.
    pub async fn lookup(&self, key: &str, freshness_days: u64) -> Option<PathBuf> {
        let index = self.index.lock().await;
        let entry = index.get(key)?;

        let age = Utc::now() - entry.cached_at;
        if age > Duration::days(i64::try_from(freshness_days).unwrap_or(i64::MAX)) {
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        let path = self.dir.join(&entry.filename);
        if path.exists() { Some(path) } else { None }
    }

    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let filename = format!("{key}.jpg");
        let path = self.dir.join(&filename);
        write_atomic(&path, bytes).await?;

        let mut index = self.index.lock().await;
        index.insert(
            key.to_string(),
            CacheEntry {
                filename,
                cached_at: Utc::now(),
            },
        );

        let raw = serde_json::to_string_pretty(&*index)?;
        write_atomic(&self.index_path, raw.as_bytes()).await?;

        debug!(key = %key, path = %path.display(), "Stored poster in cache");
        Ok(path)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
