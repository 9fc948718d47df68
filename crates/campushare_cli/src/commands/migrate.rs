//! Migration command.

use super::CommandResult;
use campushare_core::migration::{latest_version, MIGRATIONS};
use campushare_core::{Database, DatabaseConfig};
use tracing::info;

/// Applies pending migrations, or with `status_only` lists them.
pub async fn run(config: &DatabaseConfig, status_only: bool) -> CommandResult {
    let db = Database::connect(config).await?;

    if status_only {
        let current = db.schema_version().await?;
        println!("Migration Status");
        println!("================");
        println!("  Current version: {current}");
        println!("  Latest version:  {}", latest_version());
        println!();
        for migration in MIGRATIONS {
            let mark = if migration.version <= current {
                "applied"
            } else {
                "pending"
            };
            println!("  v{}: {} [{mark}]", migration.version, migration.name);
        }
    } else {
        let result = db.migrate().await?;
        if result.applied.is_empty() {
            println!("Schema is up to date (version {}).", result.final_version);
        } else {
            info!(applied = ?result.applied, "migrations applied");
            println!(
                "Applied {} migration(s); schema is at version {}.",
                result.applied.len(),
                result.final_version
            );
        }
    }

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn migrates_a_new_file() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("campus.db").display());
        let config = DatabaseConfig::new(url);

        run(&config, true).await.unwrap();
        run(&config, false).await.unwrap();

        let db = Database::connect(&config).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), latest_version());
    }
}
