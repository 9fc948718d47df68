//! Database configuration.

use std::time::Duration;

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,

    /// Maximum number of pooled connections.
    pub max_connections: u32,

    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://campushare.db".to_string(),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    /// Creates a configuration for the given URL with default values.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of pooled connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Returns true if the URL points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Connection limit actually used for the pool.
    ///
    /// Every connection to `:memory:` opens its own empty database, so
    /// in-memory databases are pinned to a single connection.
    pub fn effective_max_connections(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DatabaseConfig::default();
        assert!(config.create_if_missing);
        assert_eq!(config.max_connections, 8);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn builder_pattern() {
        let config = DatabaseConfig::new("sqlite:///tmp/x.db")
            .with_max_connections(2)
            .with_busy_timeout(Duration::from_millis(250))
            .create_if_missing(false);

        assert_eq!(config.url, "sqlite:///tmp/x.db");
        assert_eq!(config.effective_max_connections(), 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.create_if_missing);
    }

    #[test]
    fn in_memory_is_single_connection() {
        let config = DatabaseConfig::in_memory().with_max_connections(16);
        assert!(config.is_in_memory());
        assert_eq!(config.effective_max_connections(), 1);
    }

    #[test]
    fn zero_connections_is_clamped() {
        let config = DatabaseConfig::new("sqlite://a.db").with_max_connections(0);
        assert_eq!(config.effective_max_connections(), 1);
    }
}
