//! HTTP handlers, grouped by resource.

mod movies;
mod reviews;
mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::SharedState;

pub fn api() -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/search", get(movies::search))
        .route("/movies/tmdb/popular", get(movies::import_popular))
        .route("/movies/tmdb/{tmdb_id}", get(movies::external_details))
        .route("/movies/{id}", get(movies::get).put(movies::update).delete(movies::delete))
        .route(
            "/movies/{id}/reviews",
            get(reviews::list).post(reviews::add).put(reviews::update).delete(reviews::delete),
        )
        .route("/reviews/{review_id}", delete(reviews::admin_delete))
        .route("/me", get(users::me).put(users::update_me).delete(users::delete_me))
        .route("/me/password", put(users::change_password))
        .route("/users/{id}", get(users::get).delete(users::delete))
}
