//! CLI command implementations.

pub mod create_admin;
pub mod inspect;
pub mod migrate;
pub mod serve;

use campushare_core::DatabaseConfig;

/// Result type shared by the commands.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Database configuration for a URL given on the command line.
pub fn database_config(url: Option<String>) -> DatabaseConfig {
    url.map(DatabaseConfig::new).unwrap_or_default()
}
