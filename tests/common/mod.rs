#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use moviereviews::{
    auth::jwt::TokenIssuer,
    config::AdminBootstrap,
    db,
    rating::{DEFAULT_QUEUE_CAPACITY, OverflowPolicy, RatingQueue, Recalculator},
    services::{MovieService, ReviewService, UserService},
    state::AppState,
    store::{DbMovieStore, DbReviewStore, DbUserStore},
    tmdb::TmdbClient,
};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Full router over an in-memory database and the mock metadata source,
/// with a bootstrap admin account.
pub async fn build_test_app() -> Router {
    let db = db::connect_in_memory().await.expect("in-memory db");
    let movies = Arc::new(DbMovieStore::new(db.clone()));
    let reviews = Arc::new(DbReviewStore::new(db.clone()));
    let users = Arc::new(DbUserStore::new(db));

    let tmdb = TmdbClient::new(reqwest::Client::new(), String::new(), "http://unused".into(), 50);
    let (ratings, _worker) = RatingQueue::start(
        Recalculator::new(movies.clone(), reviews.clone()),
        DEFAULT_QUEUE_CAPACITY,
        OverflowPolicy::Block,
    );

    let tokens = Arc::new(TokenIssuer::new("integration-test-secret", 1));
    let state = Arc::new(AppState {
        movies: MovieService::new(movies.clone(), Arc::new(tmdb)),
        reviews: ReviewService::new(reviews, movies, ratings),
        users: UserService::new(users, tokens.clone()),
        tokens,
    });

    let admin = AdminBootstrap {
        username: "admin".into(),
        email: ADMIN_EMAIL.into(),
        password: ADMIN_PASSWORD.into(),
    };
    state.users.ensure_admin(&admin).await.expect("admin bootstrap");

    moviereviews::router(state)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None, None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, None, Some(body)).await
}

pub async fn post_json_auth(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, Some(token), None).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) =
        post_json(app, "/api/auth/login", json!({ "email": email, "password": password })).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Registers `name` with a derived email and returns a token.
pub async fn register_and_login(app: &Router, name: &str) -> String {
    let email = format!("{name}@example.com");
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        json!({ "username": name, "email": email, "password": "password-123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    login(app, &email, "password-123").await
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

pub async fn create_movie(app: &Router, token: &str, title: &str, year: i32) -> i64 {
    let (status, body) =
        post_json_auth(app, "/api/movies", token, json!({ "title": title, "year": year })).await;
    assert_eq!(status, StatusCode::CREATED, "create movie failed: {body}");
    body["id"].as_i64().unwrap()
}

/// Polls the movie until the aggregator has written `expected`.
pub async fn wait_for_rating(app: &Router, movie_id: i64, expected: f64) {
    let poll = async {
        loop {
            let (_, movie) = get(app, &format!("/api/movies/{movie_id}")).await;
            if movie["rating"].as_f64() == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("movie {movie_id} never reached rating {expected}"));
}
