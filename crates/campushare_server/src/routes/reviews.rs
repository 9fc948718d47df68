//! Moderation of uploaded resources.

use super::PageQuery;
use crate::error::ApiResult;
use crate::extract::{AuthUser, IdParam, JsonBody, Params};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campushare_core::models::{NewReview, Resource, ReviewRecord};
use campushare_core::Page;
use tracing::info;

pub(super) async fn review(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(resource_id): IdParam,
    JsonBody(input): JsonBody<NewReview>,
) -> ApiResult<(StatusCode, Json<ReviewRecord>)> {
    let record = state
        .services
        .reviews
        .review(&user.actor(), resource_id, input)
        .await?;
    info!(
        resource = resource_id,
        reviewer = user.0.id,
        decision = %record.decision,
        "resource reviewed"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub(super) async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(resource_id): IdParam,
) -> ApiResult<Json<Vec<ReviewRecord>>> {
    Ok(Json(
        state
            .services
            .reviews
            .history(&user.actor(), resource_id)
            .await?,
    ))
}

pub(super) async fn pending(
    State(state): State<AppState>,
    user: AuthUser,
    Params(query): Params<PageQuery>,
) -> ApiResult<Json<Page<Resource>>> {
    Ok(Json(
        state
            .services
            .reviews
            .pending(&user.actor(), query.request())
            .await?,
    ))
}
