//! In-process fakes shared by unit tests.

use async_trait::async_trait;

use crate::{
    models::ExternalMovie,
    tmdb::{MetadataSource, TmdbError},
};

/// Metadata source backed by a fixed list.
#[derive(Clone, Debug, Default)]
pub struct FakeSource {
    popular: Vec<ExternalMovie>,
    failing: bool,
    pub trailer: Option<String>,
}

impl FakeSource {
    pub fn with_popular(popular: Vec<ExternalMovie>) -> Self {
        Self { popular, ..Default::default() }
    }

    /// Every catalog call fails as if the upstream were down.
    pub fn failing() -> Self {
        Self { failing: true, ..Default::default() }
    }
}

#[async_trait]
impl MetadataSource for FakeSource {
    async fn fetch_popular(&self, _page: u32) -> Result<Vec<ExternalMovie>, TmdbError> {
        if self.failing {
            return Err(TmdbError::Status(503));
        }
        Ok(self.popular.clone())
    }

    async fn fetch_by_id(&self, tmdb_id: i32) -> Result<ExternalMovie, TmdbError> {
        if self.failing {
            return Err(TmdbError::Status(503));
        }
        self.popular.iter().find(|m| m.id == tmdb_id).cloned().ok_or(TmdbError::NotFound)
    }

    async fn fetch_trailer_key(&self, _tmdb_id: i32) -> Result<Option<String>, TmdbError> {
        if self.failing {
            return Err(TmdbError::Status(503));
        }
        Ok(self.trailer.clone())
    }
}

pub fn external(id: i32, title: &str, release_date: &str) -> ExternalMovie {
    ExternalMovie {
        id,
        title: title.to_string(),
        overview: format!("About {title}."),
        release_date: release_date.to_string(),
    }
}
