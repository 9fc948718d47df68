//! Registration, login and the current account.

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campushare_core::models::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
pub(super) struct Session {
    token: String,
    user: User,
}

impl Session {
    fn open(state: &AppState, user: User) -> ApiResult<Self> {
        let token = state.tokens.issue(user.id, user.role)?;
        Ok(Self { token, user })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct Login {
    /// Username or email.
    account: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PasswordChange {
    old_password: String,
    new_password: String,
}

pub(super) async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewUser>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let user = state.services.users.register(input).await?;
    info!(user = user.id, username = %user.username, "registered");
    Ok((StatusCode::CREATED, Json(Session::open(&state, user)?)))
}

pub(super) async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<Login>,
) -> ApiResult<Json<Session>> {
    let user = state
        .services
        .users
        .authenticate(&input.account, &input.password)
        .await?;
    Ok(Json(Session::open(&state, user)?))
}

pub(super) async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

pub(super) async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(input): JsonBody<PasswordChange>,
) -> ApiResult<StatusCode> {
    state
        .services
        .users
        .change_password(user.id, &input.old_password, &input.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
