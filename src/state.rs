use std::sync::Arc;

use crate::{
    auth::jwt::TokenIssuer,
    services::{MovieService, ReviewService, UserService},
};

/// Shared handler state, constructed once in `main` and passed in explicitly.
pub struct AppState {
    pub movies: MovieService,
    pub reviews: ReviewService,
    pub users: UserService,
    pub tokens: Arc<TokenIssuer>,
}

pub type SharedState = Arc<AppState>;
