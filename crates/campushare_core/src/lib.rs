//! # CampuShare Core
//!
//! Domain model, storage and services for the CampuShare course and
//! resource sharing backend.
//!
//! This crate provides:
//! - SQLite storage through a pooled [`Database`] handle with versioned migrations
//! - Services for users, courses, resources, ratings, comments, favorites and reviews
//! - Password hashing (argon2id) and HS256 JSON Web Tokens
//! - A role based permission model
//! - [`AsyncWorkerPool`] for database writes that must not block a request
//!
//! # Layering
//!
//! The HTTP layer calls services; services validate input, check
//! permissions against an [`Actor`] and run queries. Every write that changes
//! a derived counter (rating averages, resource counts, favorite and comment
//! counts) runs in the same transaction as the counter update.
//!
//! ```rust,ignore
//! use campushare_core::{Database, Services, PasswordHasher, HashCost};
//!
//! let db = Database::in_memory().await?;
//! let services = Services::new(db, PasswordHasher::new(HashCost::Standard));
//! let user = services.users.register(new_user).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
mod config;
mod db;
mod error;
pub mod migration;
pub mod models;
mod pagination;
pub mod permission;
pub mod service;
mod stats;
mod types;
pub mod worker;

pub use auth::{Claims, HashCost, PasswordHasher, TokenConfig, TokenError, TokenIssuer};
pub use config::DatabaseConfig;
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use permission::{Actor, Permission};
pub use service::Services;
pub use stats::DatabaseStats;
pub use types::{
    now_millis, CommentId, CourseId, RatingTarget, ResourceId, ResourceKind, ResourceStatus,
    ReviewDecision, ReviewId, Role, TargetKind, Timestamp, UserId, UserStatus,
};
pub use worker::{AsyncWorkerPool, WorkerPoolConfig, WorkerPoolStats};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
