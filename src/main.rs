use std::{sync::Arc, time::Duration};

use moviereviews::{
    auth::jwt::TokenIssuer,
    config::Config,
    db,
    rating::{RatingQueue, Recalculator},
    services::{MovieService, ReviewService, UserService},
    state::AppState,
    store::{DbMovieStore, DbReviewStore, DbUserStore},
    tmdb::TmdbClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,moviereviews=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("moviereviews/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let movies = Arc::new(DbMovieStore::new(db.clone()));
    let reviews = Arc::new(DbReviewStore::new(db.clone()));
    let users = Arc::new(DbUserStore::new(db));

    let tmdb = TmdbClient::new(
        http,
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    );

    // The consumer is running before any request can produce a signal.
    let (ratings, _worker) = RatingQueue::start(
        Recalculator::new(movies.clone(), reviews.clone()),
        config.rating_queue_capacity,
        config.rating_queue_overflow,
    );

    let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_ttl_hours));
    let state = Arc::new(AppState {
        movies: MovieService::new(movies.clone(), Arc::new(tmdb)),
        reviews: ReviewService::new(reviews, movies, ratings),
        users: UserService::new(users, tokens.clone()),
        tokens,
    });

    if let Some(admin) = &config.admin {
        state.users.ensure_admin(admin).await?;
    }

    let app = moviereviews::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
