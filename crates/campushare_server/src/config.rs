//! Server configuration.

use campushare_core::{DatabaseConfig, HashCost, WorkerPoolConfig};
use rand::RngCore;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Minimum length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value that doesn't parse.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// No signing secret was configured.
    #[error("CAMPUSHARE_JWT_SECRET is not set")]
    MissingSecret,

    /// The signing secret is too short.
    #[error("token secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),
}

/// Configuration for the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Database to open.
    pub database: DatabaseConfig,
    /// Token signing secret.
    pub jwt_secret: Option<Vec<u8>>,
    /// Lifetime of issued tokens.
    pub token_ttl: Duration,
    /// Background worker pool settings.
    pub workers: WorkerPoolConfig,
    /// Allowed CORS origin. Any origin when unset.
    pub cors_origin: Option<String>,
    /// Password hashing cost.
    pub hash_cost: HashCost,
    allow_insecure_secret: bool,
}

impl ServerConfig {
    /// Creates a configuration with defaults and no secret.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            database: DatabaseConfig::default(),
            jwt_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            workers: WorkerPoolConfig::default(),
            cors_origin: None,
            hash_cost: HashCost::Standard,
            allow_insecure_secret: false,
        }
    }

    /// Reads `CAMPUSHARE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads `CAMPUSHARE_*` variables through `lookup`.
    ///
    /// Unset variables keep their defaults. The secret is not checked here;
    /// see [`ServerConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse(&lookup, "CAMPUSHARE_BIND")? {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup("CAMPUSHARE_DATABASE_URL") {
            config.database = DatabaseConfig::new(url);
        }
        if let Some(max) = parse(&lookup, "CAMPUSHARE_DB_MAX_CONNECTIONS")? {
            config.database = config.database.with_max_connections(max);
        }
        if let Some(secret) = lookup("CAMPUSHARE_JWT_SECRET") {
            config.jwt_secret = Some(secret.into_bytes());
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "CAMPUSHARE_TOKEN_TTL_SECS")? {
            config.token_ttl = Duration::from_secs(secs);
        }
        if let Some(workers) = parse(&lookup, "CAMPUSHARE_WORKERS")? {
            config.workers = config.workers.with_workers(workers);
        }
        if let Some(capacity) = parse(&lookup, "CAMPUSHARE_QUEUE_CAPACITY")? {
            config.workers = config.workers.with_queue_capacity(capacity);
        }
        config.cors_origin = lookup("CAMPUSHARE_CORS_ORIGIN").filter(|o| !o.trim().is_empty());

        Ok(config)
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the database configuration.
    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = database;
        self
    }

    /// Sets the token signing secret.
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Sets the token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Sets the worker pool configuration.
    pub fn with_workers(mut self, workers: WorkerPoolConfig) -> Self {
        self.workers = workers;
        self
    }

    /// Restricts CORS to one origin.
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Sets the password hashing cost.
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Accepts any secret, generating a random one if none is set.
    ///
    /// Tokens signed with a generated secret stop verifying on restart.
    /// Local development only.
    pub fn with_insecure_dev_secret(mut self) -> Self {
        if self.jwt_secret.is_none() {
            let mut secret = vec![0u8; MIN_SECRET_LEN];
            rand::thread_rng().fill_bytes(&mut secret);
            self.jwt_secret = Some(secret);
        }
        self.allow_insecure_secret = true;
        warn!("using an insecure development token secret");
        self
    }

    /// Checks the signing secret and returns it.
    pub fn validate(&self) -> Result<&[u8], ConfigError> {
        let secret = self
            .jwt_secret
            .as_deref()
            .ok_or(ConfigError::MissingSecret)?;
        if secret.len() < MIN_SECRET_LEN && !self.allow_insecure_secret {
            return Err(ConfigError::WeakSecret(secret.len()));
        }
        Ok(secret)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl", &self.token_ttl)
            .field("workers", &self.workers)
            .field("cors_origin", &self.cors_origin)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

fn parse<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.token_ttl, DEFAULT_TOKEN_TTL);
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn reads_environment() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CAMPUSHARE_BIND", "0.0.0.0:9000"),
            ("CAMPUSHARE_DATABASE_URL", "sqlite://test.db"),
            ("CAMPUSHARE_DB_MAX_CONNECTIONS", "3"),
            ("CAMPUSHARE_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("CAMPUSHARE_TOKEN_TTL_SECS", "60"),
            ("CAMPUSHARE_WORKERS", "2"),
            ("CAMPUSHARE_QUEUE_CAPACITY", "16"),
            ("CAMPUSHARE_CORS_ORIGIN", "https://campus.example.edu"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.database.url, "sqlite://test.db");
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.token_ttl, Duration::from_secs(60));
        assert_eq!(config.workers.workers, 2);
        assert_eq!(config.workers.queue_capacity, 16);
        assert_eq!(config.cors_origin.as_deref(), Some("https://campus.example.edu"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = ServerConfig::from_lookup(lookup(&[("CAMPUSHARE_WORKERS", "many")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "CAMPUSHARE_WORKERS",
                ..
            }
        ));
    }

    #[test]
    fn short_secret_needs_dev_mode() {
        let config = ServerConfig::default().with_secret("short");
        assert!(matches!(config.validate(), Err(ConfigError::WeakSecret(5))));

        let config = config.with_insecure_dev_secret();
        assert_eq!(config.validate().unwrap(), b"short");
    }

    #[test]
    fn dev_mode_generates_secret() {
        let config = ServerConfig::default().with_insecure_dev_secret();
        assert_eq!(config.validate().unwrap().len(), MIN_SECRET_LEN);
    }

    #[test]
    fn debug_hides_secret() {
        let config = ServerConfig::default().with_secret("0123456789abcdef0123456789abcdef");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("0123456789abcdef"));
    }
}
