use std::sync::Arc;

use tracing::debug;

use crate::{
    error::{AppError, AppResult, OrNotFound},
    models::{MAX_SCORE, MIN_SCORE, NewReview, Review},
    rating::RatingQueue,
    store::{MovieStore, ReviewStore, StoreError},
};

/// Every successful mutation signals the rating aggregator; failed ones never do.
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    movies: Arc<dyn MovieStore>,
    ratings: RatingQueue,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        movies: Arc<dyn MovieStore>,
        ratings: RatingQueue,
    ) -> Self {
        Self { reviews, movies, ratings }
    }

    pub async fn add_review(&self, movie_id: i32, review: NewReview) -> AppResult<Review> {
        self.movies.get(movie_id).await.or_not_found("movie")?;

        if review.user_id <= 0 || !valid_score(review.score) {
            return Err(bad_review());
        }

        let created = self.reviews.add(movie_id, review).await.map_err(|err| match err {
            StoreError::Conflict => AppError::Conflict("movie already reviewed by this user".into()),
            other => other.into(),
        })?;
        debug!(movie_id, review_id = created.id, "review added");

        self.ratings.enqueue(movie_id).await;
        Ok(created)
    }

    pub async fn list_reviews(&self, movie_id: i32) -> AppResult<Vec<Review>> {
        self.movies.get(movie_id).await.or_not_found("movie")?;
        Ok(self.reviews.list_by_movie(movie_id).await?)
    }

    /// A missing review and someone else's review are reported identically.
    pub async fn update_review(&self, movie_id: i32, user_id: i32, score: i32) -> AppResult<()> {
        if !valid_score(score) {
            return Err(bad_review());
        }

        self.reviews
            .update_by_movie_and_user(movie_id, user_id, score)
            .await
            .map_err(ownership_error)?;
        debug!(movie_id, user_id, "review updated");

        self.ratings.enqueue(movie_id).await;
        Ok(())
    }

    /// Same ownership rule as [`ReviewService::update_review`].
    pub async fn delete_review(&self, movie_id: i32, user_id: i32) -> AppResult<()> {
        self.reviews.delete_by_movie_and_user(movie_id, user_id).await.map_err(ownership_error)?;
        debug!(movie_id, user_id, "review deleted");

        self.ratings.enqueue(movie_id).await;
        Ok(())
    }

    /// Administrative delete with no ownership check. The caller must have
    /// verified the admin role.
    pub async fn delete_review_by_id(&self, review_id: i32) -> AppResult<()> {
        let review = self.reviews.get(review_id).await.or_not_found("review")?;
        self.reviews.delete_by_id(review_id).await.or_not_found("review")?;
        debug!(review_id, movie_id = review.movie_id, "review deleted by admin");

        self.ratings.enqueue(review.movie_id).await;
        Ok(())
    }
}

fn valid_score(score: i32) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

fn bad_review() -> AppError {
    AppError::bad_input("invalid review data")
}

fn ownership_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::forbidden("review not found or not owned by caller"),
        other => other.into(),
    }
}
