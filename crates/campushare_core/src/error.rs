//! Error types for CampuShare core.

use crate::auth::TokenError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in CampuShare core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A row that was looked up does not exist (or is not visible to the caller).
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("user", "course", ...).
        entity: &'static str,
        /// The id that was looked up.
        id: i64,
    },

    /// A unique field is already taken.
    #[error("{entity} with this {field} already exists")]
    AlreadyExists {
        /// Kind of entity.
        entity: &'static str,
        /// The field that collided.
        field: &'static str,
    },

    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The actor lacks the permission for an action.
    #[error("permission denied: {action}")]
    PermissionDenied {
        /// The action that was refused.
        action: String,
    },

    /// No (valid) credentials were presented.
    #[error("authentication required")]
    Unauthenticated,

    /// Account/password pair did not match.
    #[error("invalid account or password")]
    InvalidCredentials,

    /// The account exists but is banned.
    #[error("account is banned")]
    AccountBanned,

    /// The operation conflicts with the current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// Token could not be issued or verified.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Password hashing failed.
    #[error("password error: {message}")]
    Password {
        /// Description of the failure.
        message: String,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration failed: {message}")]
    Migration {
        /// Description of the failure.
        message: String,
    },

    /// The worker pool refused a job.
    #[error("worker pool: {message}")]
    WorkerPool {
        /// Why the job was refused.
        message: String,
    },
}

impl CoreError {
    /// Creates a not found error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates an already exists error.
    pub fn already_exists(entity: &'static str, field: &'static str) -> Self {
        Self::AlreadyExists { entity, field }
    }

    /// Creates a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a password error.
    pub fn password(message: impl Into<String>) -> Self {
        Self::Password {
            message: message.into(),
        }
    }

    /// Creates a migration error.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Creates a worker pool error.
    pub fn worker_pool(message: impl Into<String>) -> Self {
        Self::WorkerPool {
            message: message.into(),
        }
    }

    /// Returns true if this is caused by the caller (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound { .. }
                | CoreError::AlreadyExists { .. }
                | CoreError::Validation { .. }
                | CoreError::PermissionDenied { .. }
                | CoreError::Unauthenticated
                | CoreError::InvalidCredentials
                | CoreError::AccountBanned
                | CoreError::Conflict { .. }
                | CoreError::Token(_)
        )
    }

    /// Returns true if this is an internal failure (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns true if the underlying database error is a UNIQUE violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            CoreError::Database(sqlx::Error::Database(err)) => err.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(CoreError::not_found("course", 3).is_client_error());
        assert!(CoreError::InvalidCredentials.is_client_error());
        assert!(CoreError::Token(TokenError::Expired).is_client_error());
        assert!(CoreError::migration("boom").is_server_error());
        assert!(CoreError::worker_pool("full").is_server_error());
        assert!(!CoreError::validation("title", "empty").is_server_error());
    }

    #[test]
    fn error_display() {
        let err = CoreError::not_found("resource", 42);
        assert_eq!(err.to_string(), "resource 42 not found");

        let err = CoreError::already_exists("user", "email");
        assert_eq!(err.to_string(), "user with this email already exists");

        let err = CoreError::validation("score", "must be between 1 and 5");
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn non_database_error_is_not_unique_violation() {
        assert!(!CoreError::conflict("x").is_unique_violation());
        assert!(!CoreError::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
