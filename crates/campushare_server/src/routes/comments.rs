//! Resource comments.

use super::PageQuery;
use crate::error::ApiResult;
use crate::extract::{AuthUser, IdParam, JsonBody, Params};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campushare_core::models::{Comment, NewComment};
use campushare_core::Page;

pub(super) async fn list(
    State(state): State<AppState>,
    IdParam(resource_id): IdParam,
    Params(query): Params<PageQuery>,
) -> ApiResult<Json<Page<Comment>>> {
    Ok(Json(
        state
            .services
            .comments
            .list(resource_id, query.request())
            .await?,
    ))
}

pub(super) async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(resource_id): IdParam,
    JsonBody(input): JsonBody<NewComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .services
        .comments
        .create(&user.actor(), resource_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<StatusCode> {
    state.services.comments.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
