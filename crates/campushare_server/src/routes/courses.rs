//! Courses and course ratings.

use super::{PageQuery, ScoreBody};
use crate::error::ApiResult;
use crate::extract::{AuthUser, IdParam, JsonBody, MaybeUser, Params};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campushare_core::models::{
    Course, CourseFilter, CourseSort, NewCourse, Rating, RatingSummary, Resource, ResourceFilter,
    ResourceSort, UpdateCourse,
};
use campushare_core::{Page, PageRequest, RatingTarget, ResourceKind, ResourceStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(super) struct CourseQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    keyword: Option<String>,
    department: Option<String>,
    semester: Option<String>,
    #[serde(default)]
    sort: CourseSort,
}

#[derive(Debug, Deserialize)]
pub(super) struct CourseResourcesQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    kind: Option<ResourceKind>,
    keyword: Option<String>,
    #[serde(default)]
    sort: ResourceSort,
}

/// A course plus the caller's own rating, if any.
#[derive(Debug, Serialize)]
pub(super) struct CourseDetail {
    #[serde(flatten)]
    course: Course,
    #[serde(skip_serializing_if = "Option::is_none")]
    my_rating: Option<i64>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    Params(query): Params<CourseQuery>,
) -> ApiResult<Json<Page<Course>>> {
    let filter = CourseFilter {
        keyword: query.keyword,
        department: query.department,
        semester: query.semester,
        sort: query.sort,
    };
    let page = PageRequest::new(query.page, query.page_size);
    Ok(Json(state.services.courses.list(&filter, page).await?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewCourse>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let course = state.services.courses.create(&user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdParam(id): IdParam,
) -> ApiResult<Json<CourseDetail>> {
    let course = state.services.courses.get(id).await?;
    let my_rating = match viewer.actor() {
        Some(actor) => state
            .services
            .ratings
            .get_mine(&actor, RatingTarget::Course(id))
            .await?
            .map(|rating| rating.score),
        None => None,
    };
    Ok(Json(CourseDetail { course, my_rating }))
}

pub(super) async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
    JsonBody(update): JsonBody<UpdateCourse>,
) -> ApiResult<Json<Course>> {
    Ok(Json(
        state
            .services
            .courses
            .update(&user.actor(), id, update)
            .await?,
    ))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    IdParam(id): IdParam,
) -> ApiResult<StatusCode> {
    state.services.courses.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approved resources of a course.
pub(super) async fn resources(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdParam(id): IdParam,
    Params(query): Params<CourseResourcesQuery>,
) -> ApiResult<Json<Page<Resource>>> {
    // 404 for unknown courses rather than an empty page.
    state.services.courses.get(id).await?;

    let filter = ResourceFilter {
        course_id: Some(id),
        kind: query.kind,
        status: Some(ResourceStatus::Approved),
        keyword: query.keyword,
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
            .rate(&user.actor(), RatingTarget::Course(id), body.score)
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
        .remove(&user.actor(), RatingTarget::Course(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn ratings(
    State(state): State<AppState>,
    IdParam(id): IdParam,
    Params(query): Params<PageQuery>,
) -> ApiResult<Json<Page<Rating>>> {
    state.services.courses.get(id).await?;
    Ok(Json(
        state
            .services
            .ratings
            .list(RatingTarget::Course(id), query.request())
            .await?,
    ))
}
