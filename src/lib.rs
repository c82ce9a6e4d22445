pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod rating;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod tmdb;

#[cfg(test)]
pub(crate) mod testing;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .nest("/api", routes::api())
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}
