use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};

use crate::models::ExternalMovie;

#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("tmdb request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tmdb has no such movie")]
    NotFound,
    #[error("tmdb responded with status {0}")]
    Status(u16),
}

/// Third-party movie catalog keyed by its own identifiers.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_popular(&self, page: u32) -> Result<Vec<ExternalMovie>, TmdbError>;
    async fn fetch_by_id(&self, tmdb_id: i32) -> Result<ExternalMovie, TmdbError>;
    /// YouTube key of the first trailer, if any.
    async fn fetch_trailer_key(&self, tmdb_id: i32) -> Result<Option<String>, TmdbError>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, access_token: String, base_url: String, rps: u32) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_ACCESS_TOKEN provided");
        }

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, access_token, base_url, limiter }
    }

    fn is_mock(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TmdbError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("language", "en-US")])
            .query(query)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(TmdbError::NotFound),
            status if !status.is_success() => Err(TmdbError::Status(status.as_u16())),
            _ => Ok(resp.json().await?),
        }
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn fetch_popular(&self, page: u32) -> Result<Vec<ExternalMovie>, TmdbError> {
        if self.is_mock() {
            return Ok(mock_popular());
        }

        let page = page.max(1);
        let resp: PopularResponse =
            self.get_json("movie/popular", &[("page", page.to_string())]).await?;
        tracing::debug!(page, results = resp.results.len(), "fetched popular movies");
        Ok(resp.results)
    }

    async fn fetch_by_id(&self, tmdb_id: i32) -> Result<ExternalMovie, TmdbError> {
        if self.is_mock() {
            let found = mock_popular().into_iter().find(|m| m.id == tmdb_id);
            return Ok(found.unwrap_or_else(|| ExternalMovie {
                id: tmdb_id,
                title: "Fight Club".to_string(),
                overview: "Mock movie details".to_string(),
                release_date: "1999-10-15".to_string(),
            }));
        }

        self.get_json(&format!("movie/{tmdb_id}"), &[]).await
    }

    async fn fetch_trailer_key(&self, tmdb_id: i32) -> Result<Option<String>, TmdbError> {
        if self.is_mock() {
            return Ok(Some("SUXWAEX2jlg".to_string()));
        }

        let resp: VideosResponse = self.get_json(&format!("movie/{tmdb_id}/videos"), &[]).await?;
        Ok(trailer_key(resp.results))
    }
}

fn trailer_key(videos: Vec<Video>) -> Option<String> {
    videos.into_iter().find(|v| v.site == "YouTube" && v.type_ == "Trailer").map(|v| v.key)
}

fn mock_popular() -> Vec<ExternalMovie> {
    [
        (550, "Fight Club", "An insomniac office worker forms an underground fight club.", "1999-10-15"),
        (438631, "Dune", "Paul Atreides leads nomadic tribes in a battle for Arrakis.", "2021-09-15"),
        (329865, "Arrival", "A linguist works with the military to communicate with aliens.", "2016-11-10"),
    ]
    .into_iter()
    .map(|(id, title, overview, release_date)| ExternalMovie {
        id,
        title: title.to_string(),
        overview: overview.to_string(),
        release_date: release_date.to_string(),
    })
    .collect()
}

#[derive(Debug, Deserialize)]
struct PopularResponse {
    results: Vec<ExternalMovie>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    key: String,
    site: String,
    #[serde(rename = "type")]
    type_: String,
}
