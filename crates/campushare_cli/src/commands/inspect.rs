//! Inspect command implementation.

use super::CommandResult;
use crate::OutputFormat;
use campushare_core::migration::latest_version;
use campushare_core::{Database, DatabaseConfig, DatabaseStats};
use serde::Serialize;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database URL.
    pub url: String,
    /// Schema version the binary expects.
    pub latest_schema_version: i64,
    /// Table statistics.
    #[serde(flatten)]
    pub stats: DatabaseStats,
}

/// Runs the inspect command.
pub async fn run(config: &DatabaseConfig, format: OutputFormat) -> CommandResult {
    let db = Database::connect(config).await?;
    if db.schema_version().await? < latest_version() {
        db.close().await;
        return Err(format!(
            "database at {} is not migrated; run `campushare migrate` first",
            config.url
        )
        .into());
    }

    let result = InspectResult {
        url: config.url.clone(),
        latest_schema_version: latest_version(),
        stats: db.stats().await?,
    };
    db.close().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print!("{}", render_text(&result)),
    }
    Ok(())
}

fn render_text(result: &InspectResult) -> String {
    let stats = &result.stats;
    let rows = [
        ("Users", stats.users),
        ("Courses", stats.courses),
        ("Resources", stats.resources),
        ("  pending review", stats.pending_resources),
        ("Ratings", stats.ratings),
        ("Comments", stats.comments),
        ("Favorites", stats.favorites),
        ("Review records", stats.reviews),
    ];

    let mut out = format!(
        "Database: {}\nSchema version: {} (latest {})\n\n",
        result.url, stats.schema_version, result.latest_schema_version
    );
    for (label, count) in rows {
        out.push_str(&format!("  {label:<18}{count:>8}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_output_lists_counts() {
        let result = InspectResult {
            url: "sqlite://campus.db".into(),
            latest_schema_version: 3,
            stats: DatabaseStats {
                users: 12,
                pending_resources: 2,
                schema_version: 3,
                ..Default::default()
            },
        };

        let text = render_text(&result);
        assert!(text.starts_with("Database: sqlite://campus.db\n"));
        assert!(text.contains("Schema version: 3 (latest 3)"));
        assert!(text.lines().any(|l| l.starts_with("  Users") && l.ends_with("12")));
        assert!(text.lines().any(|l| l.contains("pending review") && l.ends_with("2")));
    }

    #[test]
    fn json_output_is_flat() {
        let result = InspectResult {
            url: "sqlite::memory:".into(),
            latest_schema_version: 1,
            stats: DatabaseStats::default(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["users"], 0);
        assert_eq!(json["latest_schema_version"], 1);
    }

    #[tokio::test]
    async fn refuses_unmigrated_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("empty.db").display());
        let err = run(&DatabaseConfig::new(url), OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not migrated"));
    }
}
