use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{PosterSource, ProviderError, download, http_client};

const OMDB_API: &str = "https://www.omdbapi.com/";

#[derive(Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

#[derive(Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
}

impl OmdbClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.into(),
        }
    }

    async fn poster_url(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}?apikey={}&t={}",
            OMDB_API,
            self.api_key,
            urlencoding::encode(title)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let body: OmdbResponse = response.json().await?;
        if body.response != "True" {
            return Ok(None);
        }

        // Missing posters come back as the literal string "N/A".
        Ok(body.poster.filter(|p| p != "N/A"))
    }
}

#[async_trait]
impl PosterSource for OmdbClient {
    fn name(&self) -> &'static str {
        "omdb"
    }

    async fn fetch_poster(&self, title: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let Some(url) = self.poster_url(title).await? else {
            debug!(provider = "omdb", title = %title, "No poster available");
            return Ok(None);
        };

        Ok(Some(download(&self.client, &url).await?))
    }
}
