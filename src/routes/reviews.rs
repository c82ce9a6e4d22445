use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{
    error::AppResult,
    extract::{Json, Path},
    middleware::{AuthUser, RequireAdmin},
    models::{NewReview, Review},
    state::SharedState,
};

/// The author always comes from the token, never from the body.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    score: i32,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
    score: i32,
}

pub async fn list(
    State(state): State<SharedState>,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_reviews(movie_id).await?))
}

pub async fn add(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(movie_id): Path<i32>,
    Json(body): Json<ReviewBody>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = NewReview { user_id: user.user_id, score: body.score, text: body.text };
    let created = state.reviews.add_review(movie_id, review).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(movie_id): Path<i32>,
    Json(body): Json<ScoreBody>,
) -> AppResult<StatusCode> {
    state.reviews.update_review(movie_id, user.user_id, body.score).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(movie_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.reviews.delete_review(movie_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_delete(
    State(state): State<SharedState>,
    RequireAdmin(admin): RequireAdmin,
    Path(review_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.reviews.delete_review_by_id(review_id).await?;
    tracing::info!(review_id, admin_id = admin.user_id, "review removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
