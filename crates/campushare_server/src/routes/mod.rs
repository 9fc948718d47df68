//! HTTP routes.

mod auth;
mod comments;
mod courses;
mod resources;
mod reviews;
mod users;

use crate::state::AppState;
use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use campushare_core::{PageRequest, WorkerPoolStats, VERSION};
use serde::{Deserialize, Serialize};

/// Builds the API router over `state`, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/users", get(users::list))
        .route("/api/users/me", put(users::update_me))
        .route("/api/users/me/favorites", get(users::favorites))
        .route("/api/users/{id}", get(users::profile))
        .route("/api/users/{id}/role", put(users::set_role))
        .route("/api/users/{id}/status", put(users::set_status))
        .route("/api/users/{id}/resources", get(users::resources))
        .route("/api/courses", get(courses::list).post(courses::create))
        .route(
            "/api/courses/{id}",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
        .route("/api/courses/{id}/resources", get(courses::resources))
        .route(
            "/api/courses/{id}/rating",
            put(courses::rate).delete(courses::unrate),
        )
        .route("/api/courses/{id}/ratings", get(courses::ratings))
        .route("/api/resources", get(resources::list).post(resources::create))
        .route(
            "/api/resources/{id}",
            get(resources::get)
                .put(resources::update)
                .delete(resources::delete),
        )
        .route("/api/resources/{id}/download", post(resources::download))
        .route(
            "/api/resources/{id}/rating",
            put(resources::rate).delete(resources::unrate),
        )
        .route("/api/resources/{id}/ratings", get(resources::ratings))
        .route(
            "/api/resources/{id}/favorite",
            put(resources::favorite).delete(resources::unfavorite),
        )
        .route(
            "/api/resources/{id}/comments",
            get(comments::list).post(comments::create),
        )
        .route("/api/comments/{id}", delete(comments::delete))
        .route(
            "/api/resources/{id}/reviews",
            get(reviews::history).post(reviews::review),
        )
        .route("/api/reviews/pending", get(reviews::pending))
        .with_state(state)
}

/// Paging parameters on their own.
#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Body of the rating endpoints.
#[derive(Debug, Deserialize)]
struct ScoreBody {
    score: i64,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    workers: WorkerPoolStats,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: VERSION,
        workers: state.workers.stats(),
    })
}
