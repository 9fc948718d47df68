//! Shared request state.

use crate::error::ApiResult;
use campushare_core::models::User;
use campushare_core::{
    AsyncWorkerPool, CoreError, CoreResult, Database, ResourceId, Services, TokenIssuer,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Domain services.
    pub services: Services,
    /// Token issuer and verifier.
    pub tokens: Arc<TokenIssuer>,
    /// Pool for writes that run after the response.
    pub workers: Arc<AsyncWorkerPool>,
}

impl AppState {
    /// Bundles the shared handles.
    pub fn new(
        db: Database,
        services: Services,
        tokens: TokenIssuer,
        workers: Arc<AsyncWorkerPool>,
    ) -> Self {
        Self {
            db,
            services,
            tokens: Arc::new(tokens),
            workers,
        }
    }

    /// Resolves a bearer token to the account behind it.
    ///
    /// The account is reloaded so a ban or role change applies to tokens
    /// issued earlier.
    pub async fn authenticate(&self, token: &str) -> ApiResult<User> {
        let claims = self.tokens.verify(token)?;
        match self.services.users.get_active(claims.sub).await {
            Err(CoreError::NotFound { .. }) => Err(CoreError::Unauthenticated.into()),
            other => Ok(other?),
        }
    }

    /// Counts a resource view in the background.
    pub fn record_view(&self, id: ResourceId) {
        let resources = self.services.resources.clone();
        self.spawn_counter("view", id, async move { resources.record_view(id).await });
    }

    /// Counts a resource download in the background.
    pub fn record_download(&self, id: ResourceId) {
        let resources = self.services.resources.clone();
        self.spawn_counter("download", id, async move {
            resources.record_download(id).await
        });
    }

    // A full queue drops the count rather than delaying the response.
    fn spawn_counter<F>(&self, counter: &'static str, id: ResourceId, job: F)
    where
        F: Future<Output = CoreResult<()>> + Send + 'static,
    {
        let submitted = self.workers.try_submit(async move {
            if let Err(err) = job.await {
                warn!(counter, resource = id, error = %err, "failed to record counter");
            }
        });
        match submitted {
            Ok(()) => debug!(counter, resource = id, "queued counter update"),
            Err(err) => warn!(counter, resource = id, error = %err, "dropped counter update"),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
