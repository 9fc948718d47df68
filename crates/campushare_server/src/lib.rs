//! # CampuShare Server
//!
//! JSON-over-HTTP API for CampuShare, built on axum.
//!
//! This crate provides:
//! - Routes for accounts, courses, resources, ratings, comments, favorites and reviews
//! - Bearer token authentication (HS256 JWT) with per-request account checks
//! - A uniform JSON error envelope
//! - Background view and download counting on an [`AsyncWorkerPool`]
//! - Graceful shutdown on Ctrl+C / SIGTERM
//!
//! # Authentication
//!
//! Tokens are issued by `/api/auth/register` and `/api/auth/login` and sent
//! as `Authorization: Bearer <token>`. Every authenticated request reloads
//! the account, so bans and role changes apply to tokens already issued.
//!
//! ```rust,ignore
//! use campushare_server::{CampushareServer, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = CampushareServer::build(config).await?;
//! server.serve().await?;
//! ```
//!
//! [`AsyncWorkerPool`]: campushare_core::AsyncWorkerPool

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod extract;
mod routes;
mod server;
mod state;

pub use config::{ConfigError, ServerConfig, MIN_SECRET_LEN};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use extract::{AuthUser, IdParam, JsonBody, MaybeUser, Params};
pub use routes::router;
pub use server::CampushareServer;
pub use state::AppState;
