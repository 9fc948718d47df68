//! Accounts and profiles.

use super::PageQuery;
use crate::error::ApiResult;
use crate::extract::{AuthUser, IdParam, JsonBody, MaybeUser, Params};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use campushare_core::models::{
    FavoritedResource, PublicProfile, Resource, ResourceFilter, ResourceSort, UpdateProfile, User,
    UserFilter,
};
use campushare_core::{Page, PageRequest, ResourceKind, Role, UserStatus};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    keyword: Option<String>,
    role: Option<Role>,
    status: Option<UserStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadsQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    kind: Option<ResourceKind>,
    #[serde(default)]
    sort: ResourceSort,
}

#[derive(Debug, Deserialize)]
pub(super) struct RoleBody {
    role: Role,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusBody {
    status: UserStatus,
}

pub(super) async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Params(query): Params<UserQuery>,
) -> ApiResult<Json<Page<User>>> {
    let filter = UserFilter {
        keyword: query.keyword,
        role: query.role,
        status: query.status,
    };
    let page = PageRequest::new(query.page, query.page_size);
    Ok(Json(
        state.services.users.list(&user.actor(), &filter, page).await?,
    ))
}

pub(super) async fn profile(
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<PublicProfile>> {
    let user = state.services.users.get(id).await?;
    Ok(Json(user.into()))
}

pub(super) async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(update): JsonBody<UpdateProfile>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        state.services.users.update_profile(user.id, update).await?,
    ))
}

pub(super) async fn set_role(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<RoleBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        state
            .services
            .users
            .set_role(&user.actor(), id, body.role)
            .await?,
    ))
}

pub(super) async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
    JsonBody(body): JsonBody<StatusBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        state
            .services
            .users
            .set_status(&user.actor(), id, body.status)
            .await?,
    ))
}

/// Resources shared by a user. Uploads still in review show up only for
/// the uploader and reviewers.
pub(super) async fn resources(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdParam(id): IdParam,
    Params(query): Params<UploadsQuery>,
) -> ApiResult<Json<Page<Resource>>> {
    let filter = ResourceFilter {
        uploader_id: Some(id),
        kind: query.kind,
        sort: query.sort,
        ..Default::default()
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

pub(super) async fn favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Params(query): Params<PageQuery>,
) -> ApiResult<Json<Page<FavoritedResource>>> {
    Ok(Json(
        state
            .services
            .favorites
            .list(user.id, query.request())
            .await?,
    ))
}
