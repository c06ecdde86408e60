use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{PosterSource, ProviderError, download, http_client};

const TMDB_API: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    poster_path: Option<String>,
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.into(),
        }
    }

    async fn poster_url(&self, title: &str) -> Result<Option<String>, ProviderError> {
        // Multi search covers both movies and shows in one call.
        let url = format!(
            "{}/search/multi?api_key={}&query={}",
            TMDB_API,
            self.api_key,
            urlencoding::encode(title)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let search: SearchResponse = response.json().await?;
        let path = search
            .results
            .into_iter()
            .find_map(|r| r.poster_path);

        Ok(path.map(|p| format!("{TMDB_IMAGE_BASE}{p}")))
    }
}

#[async_trait]
impl PosterSource for TmdbClient {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    async fn fetch_poster(&self, title: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let Some(url) = self.poster_url(title).await? else {
            debug!(provider = "tmdb", title = %title, "No poster path in results");
            return Ok(None);
        };

        Ok(Some(download(&self.client, &url).await?))
    }
}
