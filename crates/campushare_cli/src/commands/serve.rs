//! Serve command implementation.

use super::CommandResult;
use campushare_core::DatabaseConfig;
use campushare_server::{CampushareServer, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Command-line values that take precedence over the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Database URL.
    pub database: Option<String>,
    /// Listen address.
    pub bind: Option<SocketAddr>,
    /// Background workers.
    pub workers: Option<usize>,
    /// Background queue capacity.
    pub queue_capacity: Option<usize>,
    /// Token lifetime.
    pub token_ttl_secs: Option<u64>,
    /// CORS origin.
    pub cors_origin: Option<String>,
    /// Allow an insecure token secret.
    pub dev: bool,
}

impl Overrides {
    /// Applies the overrides on top of `config`.
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(url) = self.database {
            let max = config.database.max_connections;
            config = config.with_database(DatabaseConfig::new(url).with_max_connections(max));
        }
        if let Some(bind) = self.bind {
            config = config.with_bind_addr(bind);
        }
        if let Some(workers) = self.workers {
            config.workers = config.workers.with_workers(workers);
        }
        if let Some(capacity) = self.queue_capacity {
            config.workers = config.workers.with_queue_capacity(capacity);
        }
        if let Some(secs) = self.token_ttl_secs {
            config = config.with_token_ttl(Duration::from_secs(secs));
        }
        if let Some(origin) = self.cors_origin {
            config = config.with_cors_origin(origin);
        }
        if self.dev {
            config = config.with_insecure_dev_secret();
        }
        config
    }
}

/// Runs the server until it is told to stop.
pub async fn run(overrides: Overrides) -> CommandResult {
    let config = overrides.apply(ServerConfig::from_env()?);
    let server = CampushareServer::build(config).await?;
    server.serve().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win() {
        let base = ServerConfig::default()
            .with_database(DatabaseConfig::new("sqlite://env.db").with_max_connections(3))
            .with_secret("from-the-environment-0123456789abcdef");

        let config = Overrides {
            database: Some("sqlite://flag.db".into()),
            workers: Some(7),
            token_ttl_secs: Some(90),
            ..Default::default()
        }
        .apply(base);

        assert_eq!(config.database.url, "sqlite://flag.db");
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.workers.workers, 7);
        assert_eq!(config.token_ttl, Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn no_overrides_keep_config() {
        let base = ServerConfig::default().with_cors_origin("https://campus.example.edu");
        let config = Overrides::default().apply(base);
        assert_eq!(config.cors_origin.as_deref(), Some("https://campus.example.edu"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn dev_flag_allows_missing_secret() {
        let config = Overrides {
            dev: true,
            ..Default::default()
        }
        .apply(ServerConfig::default());
        assert!(config.validate().is_ok());
    }
}
