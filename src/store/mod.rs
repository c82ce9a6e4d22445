//! Persistence contracts and their sea-orm implementations.
//!
//! Services only see the traits; stores are the sole writers of persisted
//! state. Each call is atomic on its own; there are no cross-call
//! transactions.

mod movies;
mod reviews;
mod users;

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};

pub use movies::DbMovieStore;
pub use reviews::DbReviewStore;
pub use users::DbUserStore;

use crate::models::{Movie, NewMovieRecord, NewReview, NewUserRecord, Review, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record conflicts with an existing one")]
    Conflict,
    #[error(transparent)]
    Db(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Conflict,
            _ => StoreError::Db(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Persists a movie with a fresh identifier and a rating of zero.
    async fn create(&self, movie: NewMovieRecord) -> StoreResult<Movie>;
    async fn all(&self) -> StoreResult<Vec<Movie>>;
    async fn get(&self, id: i32) -> StoreResult<Movie>;
    async fn get_by_tmdb_id(&self, tmdb_id: i32) -> StoreResult<Movie>;
    async fn exists_by_tmdb_id(&self, tmdb_id: i32) -> StoreResult<bool>;
    /// Replaces title, year, description and external id. The rating is
    /// left alone; see [`MovieStore::set_rating`].
    async fn update(&self, movie: &Movie) -> StoreResult<Movie>;
    /// Deletes the movie together with its reviews.
    async fn delete(&self, id: i32) -> StoreResult<()>;
    /// Only the rating aggregator calls this.
    async fn set_rating(&self, id: i32, rating: f64) -> StoreResult<()>;
    /// Case-insensitive title substring (empty matches all) and exact year
    /// (0 matches all).
    async fn search(&self, title: &str, year: i32) -> StoreResult<Vec<Movie>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn add(&self, movie_id: i32, review: NewReview) -> StoreResult<Review>;
    async fn list_by_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>>;
    async fn update_by_movie_and_user(&self, movie_id: i32, user_id: i32, score: i32)
    -> StoreResult<()>;
    async fn delete_by_movie_and_user(&self, movie_id: i32, user_id: i32) -> StoreResult<()>;
    async fn get(&self, id: i32) -> StoreResult<Review>;
    async fn delete_by_id(&self, id: i32) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUserRecord) -> StoreResult<User>;
    async fn get_by_email(&self, email: &str) -> StoreResult<User>;
    async fn get(&self, id: i32) -> StoreResult<User>;
    /// Writes username and email.
    async fn update(&self, user: &User) -> StoreResult<User>;
    async fn update_password(&self, id: i32, password_hash: &str) -> StoreResult<()>;
    async fn delete(&self, id: i32) -> StoreResult<()>;
}

fn expect_rows(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 { Err(StoreError::NotFound) } else { Ok(()) }
}
