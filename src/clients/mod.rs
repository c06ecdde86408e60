pub mod anilist;
pub mod omdb;
pub mod tmdb;
pub mod tvmaze;

pub use anilist::AnilistClient;
pub use omdb::OmdbClient;
pub use tmdb::TmdbClient;
pub use tvmaze::TvmazeClient;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::constants::timeouts;

const USER_AGENT: &str = "Iconarr/0.1";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

/// A metadata provider that can resolve a title to raw poster bytes.
///
/// Implementations return `Ok(None)` when the provider answered but had no
/// match, and `Err` only for transport or protocol failures.
#[async_trait]
pub trait PosterSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_poster(&self, title: &str) -> Result<Option<Vec<u8>>, ProviderError>;
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeouts::PROVIDER_REQUEST)
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub(crate) async fn download(client: &Client, url: &str) -> Result<Vec<u8>, ProviderError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ProviderError::Status(response.status()));
    }
    Ok(response.bytes().await?.to_vec())
}
