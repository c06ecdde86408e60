use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{PosterSource, ProviderError, download, http_client};

const TVMAZE_API: &str = "https://api.tvmaze.com";

#[derive(Deserialize)]
struct Show {
    image: Option<ShowImage>,
}

#[derive(Deserialize)]
struct ShowImage {
    original: Option<String>,
    medium: Option<String>,
}

#[derive(Clone)]
pub struct TvmazeClient {
    client: Client,
}

impl Default for TvmazeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TvmazeClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    async fn poster_url(&self, title: &str) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/singlesearch/shows?q={}",
            TVMAZE_API,
            urlencoding::encode(title)
        );

        let response = self.client.get(&url).send().await?;

        // TVmaze answers a miss with 404 rather than an empty body.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let show: Show = response.json().await?;
        Ok(show.image.and_then(|i| i.original.or(i.medium)))
    }
}

#[async_trait]
impl PosterSource for TvmazeClient {
    fn name(&self) -> &'static str {
        "tvmaze"
    }

    async fn fetch_poster(&self, title: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let Some(url) = self.poster_url(title).await? else {
            debug!(provider = "tvmaze", title = %title, "No show image found");
            return Ok(None);
        };

        Ok(Some(download(&self.client, &url).await?))
    }
}
