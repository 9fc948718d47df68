//! Shared resources, their ratings and favorites.

use super::{PageQuery, ScoreBody};
use crate::error::ApiResult;
use crate::extract::{AuthUser, IdParam, JsonBody, MaybeUser, Params};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campushare_core::models::{
    NewResource, Rating, RatingSummary, Resource, ResourceFilter, ResourceSort, UpdateResource,
};
use campushare_core::{
    CourseId, Page, PageRequest, RatingTarget, ResourceKind, ResourceStatus, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub(super) struct ResourceQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    course_id: Option<CourseId>,
    uploader_id: Option<UserId>,
    kind: Option<ResourceKind>,
    status: Option<ResourceStatus>,
    keyword: Option<String>,
    #[serde(default)]
    sort: ResourceSort,
}

/// A resource plus what the caller has done with it.
#[derive(Debug, Serialize)]
pub(super) struct ResourceDetail {
    #[serde(flatten)]
    resource: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    favorited: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    my_rating: Option<i64>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Params(query): Params<ResourceQuery>,
) -> ApiResult<Json<Page<Resource>>> {
    let filter = ResourceFilter {
        course_id: query.course_id,
        uploader_id: query.uploader_id,
        kind: query.kind,
        status: query.status,
        keyword: query.keyword,
        sort: query.sort,
    };
    let page = PageRequest::new(query.page, query.page_size);
    let viewer = viewer.actor();
    Ok(Json(
        state
            .services
            .resources
            .list(viewer.as_ref(), &filter, page)
            .await?,
    ))
}

pub(super) async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewResource>,
) -> ApiResult<(StatusCode, Json<Resource>)> {
    let resource = state.services.resources.create(&user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// Returns a resource and counts the view in the background.
pub(super) async fn get(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdParam(id): IdParam,
) -> ApiResult<Json<ResourceDetail>> {
    let actor = viewer.actor();
    let resource = state.services.resources.get(actor.as_ref(), id).await?;

    let (favorited, my_rating) = match actor {
        Some(actor) => {
            let favorited = state
                .services
                .favorites
                .is_favorite(actor.user_id, id)
                .await?;
            let rating = state
                .services
                .ratings
                .get_mine(&actor, RatingTarget::Resource(id))
                .await?;
            (Some(favorited), rating.map(|r| r.score))
        }
        None => (None, None),
    };

    if resource.is_approved() {
        state.record_view(id);
    }
    Ok(Json(ResourceDetail {
        resource,
        favorited,
        my_rating,
    }))
}

pub(super) async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
    JsonBody(update): JsonBody<UpdateResource>,
) -> ApiResult<Json<Resource>> {
    Ok(Json(
        state
            .services
            .resources
            .update(&user.actor(), id, update)
            .await?,
    ))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<StatusCode> {
    state.services.resources.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the file URL and counts the download in the background.
pub(super) async fn download(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdParam(id): IdParam,
) -> ApiResult<Json<Value>> {
    let viewer = viewer.actor();
    let url = state
        .services
        .resources
        .download_url(viewer.as_ref(), id)
        .await?;
    state.record_download(id);
    Ok(Json(json!({ "url": url })))
}

pub(super) async fn rate(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<ScoreBody>,
) -> ApiResult<Json<RatingSummary>> {
    Ok(Json(
        state
            .services
            .ratings
            .rate(&user.actor(), RatingTarget::Resource(id), body.score)
            .await?,
    ))
}

pub(super) async fn unrate(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<StatusCode> {
    state
        .services
        .ratings
        .remove(&user.actor(), RatingTarget::Resource(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn ratings(
    State(state): State<AppState>,
    IdParam(id): IdParam,
    Params(query): Params<PageQuery>,
) -> ApiResult<Json<Page<Rating>>> {
    // Ratings of hidden resources stay hidden.
    state.services.resources.get(None, id).await?;
    Ok(Json(
        state
            .services
            .ratings
            .list(RatingTarget::Resource(id), query.request())
            .await?,
    ))
}

pub(super) async fn favorite(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<Json<Value>> {
    let added = state.services.favorites.add(&user.actor(), id).await?;
    Ok(Json(json!({ "favorited": true, "added": added })))
}

pub(super) async fn unfavorite(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<StatusCode> {
    state.services.favorites.remove(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
