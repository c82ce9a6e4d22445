use std::net::SocketAddr;

use anyhow::{Context, bail};

use crate::rating::OverflowPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_access_token: String,
    pub tmdb_base_url: String,
    pub tmdb_rps: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub rating_queue_capacity: usize,
    pub rating_queue_overflow: OverflowPolicy,
    pub admin: Option<AdminBootstrap>,
}

/// Account created at startup when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://moviereviews.db?mode=rwc".to_string());

        let tmdb_access_token = std::env::var("TMDB_ACCESS_TOKEN").unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let jwt_ttl_hours: i64 =
            std::env::var("JWT_TTL_HOURS").ok().and_then(|s| s.parse().ok()).unwrap_or(24);

        let rating_queue_capacity: usize =
            std::env::var("RATING_QUEUE_CAPACITY").ok().and_then(|s| s.parse().ok()).unwrap_or(10);
        let rating_queue_overflow = match std::env::var("RATING_QUEUE_OVERFLOW") {
            Ok(s) => s.parse().context("RATING_QUEUE_OVERFLOW")?,
            Err(_) => OverflowPolicy::default(),
        };

        let admin = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminBootstrap {
                username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_rps,
            jwt_secret,
            jwt_ttl_hours,
            rating_queue_capacity,
            rating_queue_overflow,
            admin,
        })
    }
}
