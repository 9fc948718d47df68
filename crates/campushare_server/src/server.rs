//! Server assembly and lifecycle.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes;
use crate::state::AppState;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Request};
use axum::Router;
use campushare_core::{
    AsyncWorkerPool, Database, PasswordHasher, Services, TokenConfig, TokenIssuer,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// The CampuShare HTTP server.
///
/// Owns the database, the services and the background worker pool.
///
/// # Example
///
/// ```rust,ignore
/// use campushare_server::{CampushareServer, ServerConfig};
///
/// let config = ServerConfig::from_env()?;
/// let server = CampushareServer::build(config).await?;
/// server.serve().await?;
/// ```
pub struct CampushareServer {
    config: ServerConfig,
    state: AppState,
}

impl CampushareServer {
    /// Opens (and migrates) the database and wires up the services.
    pub async fn build(config: ServerConfig) -> ServerResult<Self> {
        let secret = config.validate()?.to_vec();
        let db = Database::open(&config.database).await?;
        let services = Services::new(db.clone(), PasswordHasher::new(config.hash_cost));
        let tokens = TokenIssuer::new(TokenConfig::new(secret).with_ttl(config.token_ttl));
        let workers = Arc::new(AsyncWorkerPool::new(config.workers));

        info!(
            workers = workers.worker_count(),
            token_ttl_secs = config.token_ttl.as_secs(),
            "server initialized"
        );
        Ok(Self {
            state: AppState::new(db, services, tokens, workers),
            config,
        })
    }

    /// Shared state, for seeding and inspection.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The full application: routes, CORS and request tracing.
    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
            .layer(cors_layer(self.config.cors_origin.as_deref()))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    info_span!(
                        "request",
                        id = %Uuid::new_v4(),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
    }

    /// Binds the configured address and serves until Ctrl+C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `signal` resolves, then drains the worker
    /// pool and closes the database.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!(%addr, "listening");

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;

        info!("listener stopped, draining background jobs");
        self.shutdown().await;
        served.map_err(ServerError::from)
    }

    /// Stops the worker pool (running queued jobs first) and closes the
    /// database.
    pub async fn shutdown(&self) {
        self.state.workers.shutdown().await;
        let stats = self.state.workers.stats();
        if stats.panicked > 0 {
            warn!(panicked = stats.panicked, "background jobs panicked");
        }
        self.state.db.close().await;
        info!(completed = stats.completed, "server stopped");
    }
}

impl std::fmt::Debug for CampushareServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampushareServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            warn!("ignoring invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campushare_core::{DatabaseConfig, HashCost};

    fn config() -> ServerConfig {
        ServerConfig::default()
            .with_database(DatabaseConfig::in_memory())
            .with_secret("0123456789abcdef0123456789abcdef")
            .with_hash_cost(HashCost::Fast)
    }

    #[tokio::test]
    async fn build_requires_a_secret() {
        let config = ServerConfig::default().with_database(DatabaseConfig::in_memory());
        assert!(matches!(
            CampushareServer::build(config).await,
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn serves_until_signalled() {
        let server = CampushareServer::build(config()).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let workers = Arc::clone(&server.state().workers);

        server.serve_on(listener, async {}).await.unwrap();
        assert!(workers.is_shut_down());
    }
}
