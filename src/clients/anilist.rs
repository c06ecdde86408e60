use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PosterSource, ProviderError, download, http_client};

const ANILIST_API: &str = "https://graphql.anilist.co";

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Variables<'a>,
}

#[derive(Serialize)]
struct Variables<'a> {
    search: &'a str,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<Data>,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Deserialize)]
struct Page {
    media: Vec<Media>,
}

#[derive(Deserialize)]
struct Media {
    #[serde(rename = "coverImage")]
    cover_image: Option<CoverImage>,
}

#[derive(Deserialize)]
struct CoverImage {
    #[serde(rename = "extraLarge")]
    extra_large: Option<String>,
    large: Option<String>,
}

#[derive(Clone)]
pub struct AnilistClient {
    client: Client,
}

impl Default for AnilistClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AnilistClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    async fn poster_url(&self, search: &str) -> Result<Option<String>, ProviderError> {
        let gql_query = r#"
            query ($search: String) {
                Page(page: 1, perPage: 5) {
                    media(search: $search, type: ANIME) {
                        coverImage { extraLarge large }
                    }
                }
            }
        "#;

        let request_body = GraphQLRequest {
            query: gql_query,
            variables: Variables { search },
        };

        let response: GraphQLResponse = self
            .client
            .post(ANILIST_API)
            .json(&request_body)
            .send()
            .await?
            .json()
            .await?;

        let url = response
            .data
            .map(|d| d.page.media)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.cover_image)
            .find_map(|c| c.extra_large.or(c.large));

        Ok(url)
    }
}

#[async_trait]
impl PosterSource for AnilistClient {
    fn name(&self) -> &'static str {
        "anilist"
    }

    async fn fetch_poster(&self, title: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let Some(url) = self.poster_url(title).await? else {
            debug!(provider = "anilist", title = %title, "No cover image found");
            return Ok(None);
        };

        Ok(Some(download(&self.client, &url).await?))
    }
}
