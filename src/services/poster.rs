use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{AnilistClient, OmdbClient, PosterSource, TmdbClient, TvmazeClient};
use crate::config::Config;
use crate::library::MediaKind;
use crate::services::cache::{KindTag, PosterCache, cache_key};
use crate::services::image::{mock_poster, normalize_poster};

/// Resolves a title to a cached poster file, trying providers in order of
/// relevance for the media kind. Keyed providers are only in the chain when
/// their API key is configured.
pub struct PosterService {
    cache: PosterCache,
    anime_source: Arc<dyn PosterSource>,
    series_sources: Vec<Arc<dyn PosterSource>>,
    movie_sources: Vec<Arc<dyn PosterSource>>,
    mock_mode: bool,
    cache_enabled: bool,
    freshness_days: u64,
    max_dimension: u32,
}

impl PosterService {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let tmdb = config
            .providers
            .tmdb_key()
            .map(|key| Arc::new(TmdbClient::new(key)) as Arc<dyn PosterSource>);
        let omdb = config
            .providers
            .omdb_key()
            .map(|key| Arc::new(OmdbClient::new(key)) as Arc<dyn PosterSource>);

        let tvmaze: Arc<dyn PosterSource> = Arc::new(TvmazeClient::new());

        let mut series_sources = vec![tvmaze];
        series_sources.extend(tmdb.iter().cloned());
        series_sources.extend(omdb.iter().cloned());

        let mut movie_sources = Vec::new();
        movie_sources.extend(tmdb);
        movie_sources.extend(omdb);

        Ok(Self {
            cache: PosterCache::open(config.cache_dir()).await?,
            anime_source: Arc::new(AnilistClient::new()),
            series_sources,
            movie_sources,
            mock_mode: config.cache.mock_mode,
            cache_enabled: config.cache.enabled,
            freshness_days: config.library.freshness_days,
            max_dimension: config.poster.max_dimension,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_sources(
        cache: PosterCache,
        anime_source: Arc<dyn PosterSource>,
        series_sources: Vec<Arc<dyn PosterSource>>,
        movie_sources: Vec<Arc<dyn PosterSource>>,
    ) -> Self {
        Self {
            cache,
            anime_source,
            series_sources,
            movie_sources,
            mock_mode: false,
            cache_enabled: true,
            freshness_days: 30,
            max_dimension: 1024,
        }
    }

    /// Fetch poster bytes for `title`. Mock mode generates a placeholder and
    /// touches neither the network nor the cache; otherwise the cache is
    /// consulted first and provider wins are cached. `None` means every
    /// provider missed.
    pub async fn fetch(
        &self,
        title: &str,
        kind: MediaKind,
        is_anime: bool,
    ) -> Result<Option<Vec<u8>>> {
        if self.mock_mode {
            debug!(title = %title, "Mock mode, generating placeholder poster");
            return Ok(Some(mock_poster()?));
        }

        let tag = if is_anime {
            KindTag::Anime
        } else if kind == MediaKind::Movie {
            KindTag::Movie
        } else {
            KindTag::Tv
        };
        let key = cache_key(title, tag);

        if self.cache_enabled
            && let Some(path) = self.cache.lookup(&key, self.freshness_days).await
        {
            debug!(title = %title, key = %key, "Poster cache hit");
            return Ok(Some(tokio::fs::read(&path).await?));
        }

        for source in self.trial_order(kind, is_anime) {
            match source.fetch_poster(title).await {
                Ok(Some(bytes)) => {
                    let normalized = match normalize_poster(&bytes, self.max_dimension) {
                        Ok(n) => n,
                        Err(e) => {
                            warn!(provider = source.name(), title = %title, error = %e, "Unusable poster data");
                            continue;
                        }
                    };
                    self.cache.store(&key, &normalized).await?;
                    info!(provider = source.name(), title = %title, "Poster fetched");
                    return Ok(Some(normalized));
                }
                Ok(None) => {
                    debug!(provider = source.name(), title = %title, "Provider had no match");
                }
                Err(e) => {
                    warn!(provider = source.name(), title = %title, error = %e, "Provider request failed");
                }
            }
        }

        info!(title = %title, "No poster found from any provider");
        Ok(None)
    }

    fn trial_order(&self, kind: MediaKind, is_anime: bool) -> Vec<Arc<dyn PosterSource>> {
        let chain = if kind == MediaKind::Movie {
            &self.movie_sources
        } else {
            &self.series_sources
        };

        let mut order = Vec::with_capacity(chain.len() + 1);
        if is_anime {
            order.push(Arc::clone(&self.anime_source));
            order.extend(chain.iter().cloned());
        } else {
            order.extend(chain.iter().cloned());
            // Anime catalogs still cover plenty of general titles, worth a
            // final attempt before giving up.
            order.push(Arc::clone(&self.anime_source));
        }
        order
    }
}
