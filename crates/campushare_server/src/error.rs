//! Error types for the HTTP server.

use crate::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campushare_core::{CoreError, TokenError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for starting and running the server.
pub type ServerResult<T> = Result<T, ServerError>;

/// An error returned to an HTTP client.
///
/// Rendered as `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A service refused or failed the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                CoreError::Unauthenticated
                | CoreError::InvalidCredentials
                | CoreError::Token(_) => StatusCode::UNAUTHORIZED,
                CoreError::PermissionDenied { .. } | CoreError::AccountBanned => {
                    StatusCode::FORBIDDEN
                }
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::AlreadyExists { .. } | CoreError::Conflict { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::WorkerPool { .. }
                | CoreError::Password { .. }
                | CoreError::Database(_)
                | CoreError::Migration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Core(err) => match err {
                CoreError::NotFound { .. } => "not_found",
                CoreError::AlreadyExists { .. } => "already_exists",
                CoreError::Validation { .. } => "validation_failed",
                CoreError::PermissionDenied { .. } => "permission_denied",
                CoreError::Unauthenticated => "unauthenticated",
                CoreError::InvalidCredentials => "invalid_credentials",
                CoreError::AccountBanned => "account_banned",
                CoreError::Conflict { .. } => "conflict",
                CoreError::Token(TokenError::Expired) => "token_expired",
                CoreError::Token(_) => "invalid_token",
                CoreError::WorkerPool { .. }
                | CoreError::Password { .. }
                | CoreError::Database(_)
                | CoreError::Migration { .. } => "internal_error",
            },
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            status
                .canonical_reason()
                .unwrap_or("internal error")
                .to_ascii_lowercase()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opening the database or migrating it failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error (binding the listener, serving).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (CoreError::validation("title", "empty"), StatusCode::BAD_REQUEST),
            (CoreError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (CoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (TokenError::Expired.into(), StatusCode::UNAUTHORIZED),
            (CoreError::permission_denied("x"), StatusCode::FORBIDDEN),
            (CoreError::AccountBanned, StatusCode::FORBIDDEN),
            (CoreError::not_found("course", 1), StatusCode::NOT_FOUND),
            (CoreError::already_exists("user", "email"), StatusCode::CONFLICT),
            (CoreError::conflict("busy"), StatusCode::CONFLICT),
            (CoreError::migration("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = render(CoreError::not_found("resource", 7).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "resource 7 not found");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = render(CoreError::migration("table users is corrupt").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn expired_tokens_have_their_own_code() {
        let (_, body) = render(TokenError::Expired.into()).await;
        assert_eq!(body["error"]["code"], "token_expired");
    }
}
