use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{
    error::AppResult,
    extract::{Json, Path, Query},
    middleware::AuthUser,
    models::{ExternalMovieDetails, Movie, MoviePatch, MovieSearch, NewMovie},
    state::SharedState,
};

pub async fn list(State(state): State<SharedState>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list_movies().await?))
}

pub async fn get(State(state): State<SharedState>, Path(id): Path<i32>) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.get_movie(id).await?))
}

pub async fn search(
    State(state): State<SharedState>,
    Query(q): Query<MovieSearch>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.search(&q.title, q.year).await?))
}

pub async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(input): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = state.movies.create_movie(input).await?;
    tracing::info!(movie_id = movie.id, user_id = user.user_id, "movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(patch): Json<MoviePatch>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.update_movie(id, patch).await?))
}

pub async fn delete(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.movies.delete_movie(id).await?;
    tracing::info!(movie_id = id, user_id = user.user_id, "movie deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    page: u32,
}

fn first_page() -> u32 {
    1
}

pub async fn import_popular(
    State(state): State<SharedState>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.import_popular(q.page).await?))
}

pub async fn external_details(
    State(state): State<SharedState>,
    Path(tmdb_id): Path<i32>,
) -> AppResult<Json<ExternalMovieDetails>> {
    Ok(Json(state.movies.external_details(tmdb_id).await?))
}
