use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    extract::{Json, Path},
    middleware::{AuthUser, RequireAdmin},
    models::{Credentials, ProfilePatch, Registration, UserProfile},
    state::SharedState,
};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    password: String,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(input): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.users.login(credentials).await?;
    Ok(Json(TokenResponse { token }))
}

pub async fn me(State(state): State<SharedState>, user: AuthUser) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users.profile(user.user_id).await?))
}

pub async fn update_me(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users.update_profile(user.user_id, patch).await?))
}

pub async fn delete_me(State(state): State<SharedState>, user: AuthUser) -> AppResult<StatusCode> {
    state.users.delete_account(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(body): Json<PasswordChange>,
) -> AppResult<StatusCode> {
    state.users.change_password(user.user_id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    State(state): State<SharedState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users.profile(id).await?))
}

pub async fn delete(
    State(state): State<SharedState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.users.delete_account(id).await?;
    tracing::info!(user_id = id, admin_id = admin.user_id, "account removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
