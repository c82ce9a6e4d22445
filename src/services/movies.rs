use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult, OrNotFound},
    models::{ExternalMovie, ExternalMovieDetails, Movie, MoviePatch, NewMovie, NewMovieRecord},
    store::{MovieStore, StoreError},
    tmdb::{MetadataSource, TmdbError},
};

const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Clone)]
pub struct MovieService {
    movies: Arc<dyn MovieStore>,
    source: Arc<dyn MetadataSource>,
}

impl MovieService {
    pub fn new(movies: Arc<dyn MovieStore>, source: Arc<dyn MetadataSource>) -> Self {
        Self { movies, source }
    }

    pub async fn create_movie(&self, input: NewMovie) -> AppResult<Movie> {
        let title = input.title.trim();
        if title.is_empty() || input.year <= 0 {
            return Err(AppError::bad_input("invalid movie data"));
        }

        let movie = self
            .movies
            .create(NewMovieRecord {
                tmdb_id: None,
                title: title.to_string(),
                year: input.year,
                description: input.description,
            })
            .await?;
        debug!(movie_id = movie.id, "movie created");
        Ok(movie)
    }

    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        Ok(self.movies.all().await?)
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<Movie> {
        self.movies.get(id).await.or_not_found("movie")
    }

    /// Merges the non-empty, positive fields of `patch` into the stored movie.
    pub async fn update_movie(&self, id: i32, patch: MoviePatch) -> AppResult<Movie> {
        let mut movie = self.movies.get(id).await.or_not_found("movie")?;

        if let Some(title) = patch.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            movie.title = title.to_string();
        }
        if let Some(year) = patch.year.filter(|&y| y > 0) {
            movie.year = year;
        }
        if let Some(description) = patch.description.filter(|d| !d.is_empty()) {
            movie.description = description;
        }

        self.movies.update(&movie).await.or_not_found("movie")
    }

    /// Reviews of the movie go with it.
    pub async fn delete_movie(&self, id: i32) -> AppResult<()> {
        self.movies.delete(id).await.or_not_found("movie")?;
        debug!(movie_id = id, "movie deleted");
        Ok(())
    }

    pub async fn search(&self, title: &str, year: i32) -> AppResult<Vec<Movie>> {
        Ok(self.movies.search(title, year).await?)
    }

    /// Imports a page of popular movies. Movies already linked to an
    /// external id are returned as they are stored, never duplicated.
    pub async fn import_popular(&self, page: u32) -> AppResult<Vec<Movie>> {
        let external = self.source.fetch_popular(page).await.map_err(|err| {
            warn!(page, error = %err, "failed to fetch popular movies");
            AppError::UpstreamUnavailable
        })?;

        debug!(page, fetched = external.len(), "importing popular movies");

        let imported: Vec<Option<Movie>> = stream::iter(external)
            .then(|m| async move {
                let tmdb_id = m.id;
                match self.import_one(m).await {
                    Ok(movie) => Some(movie),
                    Err(err) => {
                        warn!(tmdb_id, error = %err, "failed to import movie");
                        None
                    },
                }
            })
            .collect()
            .await;

        Ok(imported.into_iter().flatten().collect())
    }

    async fn import_one(&self, m: ExternalMovie) -> Result<Movie, StoreError> {
        if self.movies.exists_by_tmdb_id(m.id).await? {
            return self.movies.get_by_tmdb_id(m.id).await;
        }

        let record = NewMovieRecord {
            tmdb_id: Some(m.id),
            year: m.release_year(),
            title: m.title,
            description: m.overview,
        };
        match self.movies.create(record).await {
            // Lost a race with a concurrent import of the same movie.
            Err(StoreError::Conflict) => self.movies.get_by_tmdb_id(m.id).await,
            other => other,
        }
    }

    /// External details plus a trailer link. A failed trailer lookup only
    /// drops the link.
    pub async fn external_details(&self, tmdb_id: i32) -> AppResult<ExternalMovieDetails> {
        let movie = self.source.fetch_by_id(tmdb_id).await.map_err(|err| match err {
            TmdbError::NotFound => AppError::NotFound("external movie"),
            err => {
                warn!(tmdb_id, error = %err, "failed to fetch movie details");
                AppError::UpstreamUnavailable
            },
        })?;

        let trailer_key = self.source.fetch_trailer_key(tmdb_id).await.unwrap_or_else(|err| {
            warn!(tmdb_id, error = %err, "failed to fetch trailer");
            None
        });

        Ok(ExternalMovieDetails {
            tmdb_id: movie.id,
            title: movie.title,
            description: movie.overview,
            release_date: movie.release_date,
            trailer_url: trailer_key
                .filter(|k| !k.is_empty())
                .map(|k| format!("{YOUTUBE_WATCH_URL}{k}")),
        })
    }
}
