//! Database migration support.
//!
//! Migrations in CampuShare are:
//! - **Compiled in**: the schema ships with the binary, see [`MIGRATIONS`]
//! - **Forward-only**: rollbacks are not automatic (use backups instead)
//! - **Transactional**: each migration runs in its own transaction
//! - **Recorded**: applied versions are kept in `schema_migrations`
//!
//! Running the migrations twice is a no-op.

use crate::error::{CoreError, CoreResult};
use crate::types::now_millis;
use sqlx::SqlitePool;
use tracing::info;

/// Version number for migrations.
pub type MigrationVersion = i64;

/// A single schema migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version number (unique, increasing).
    pub version: MigrationVersion,
    /// Human-readable name.
    pub name: &'static str,
    /// Statements executed in order.
    pub statements: &'static [&'static str],
}

/// Result of running all pending migrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRunResult {
    /// Versions applied by this run.
    pub applied: Vec<MigrationVersion>,
    /// The schema version after the run.
    pub final_version: MigrationVersion,
}

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                nickname TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                bio TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'student',
                status TEXT NOT NULL DEFAULT 'active',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        ],
    },
    Migration {
        version: 2,
        name: "create_courses",
        statements: &[
            "CREATE TABLE courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                teacher_name TEXT NOT NULL DEFAULT '',
                department TEXT NOT NULL DEFAULT '',
                credits REAL NOT NULL DEFAULT 0,
                semester TEXT NOT NULL DEFAULT '',
                created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
                rating_avg REAL NOT NULL DEFAULT 0,
                rating_count INTEGER NOT NULL DEFAULT 0,
                resource_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_courses_department ON courses(department)",
        ],
    },
    Migration {
        version: 3,
        name: "create_resources",
        statements: &[
            "CREATE TABLE resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL REFERENCES courses(id),
                uploader_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL DEFAULT 'other',
                url TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                view_count INTEGER NOT NULL DEFAULT 0,
                download_count INTEGER NOT NULL DEFAULT 0,
                favorite_count INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                rating_avg REAL NOT NULL DEFAULT 0,
                rating_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_resources_course ON resources(course_id, status)",
            "CREATE INDEX idx_resources_uploader ON resources(uploader_id)",
            "CREATE INDEX idx_resources_status ON resources(status, created_at)",
        ],
    },
    Migration {
        version: 4,
        name: "create_ratings",
        statements: &[
            "CREATE TABLE ratings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_kind TEXT NOT NULL,
                target_id INTEGER NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, target_kind, target_id)
            )",
            "CREATE INDEX idx_ratings_target ON ratings(target_kind, target_id)",
        ],
    },
    Migration {
        version: 5,
        name: "create_comments",
        statements: &[
            "CREATE TABLE comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                parent_id INTEGER REFERENCES comments(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_comments_resource ON comments(resource_id, created_at)",
        ],
    },
    Migration {
        version: 6,
        name: "create_favorites",
        statements: &[
            "CREATE TABLE favorites (
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, resource_id)
            )",
        ],
    },
    Migration {
        version: 7,
        name: "create_review_records",
        statements: &[
            "CREATE TABLE review_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
                reviewer_id INTEGER NOT NULL REFERENCES users(id),
                decision TEXT NOT NULL,
                reason TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_review_records_resource ON review_records(resource_id)",
        ],
    },
];

/// Returns the version of the newest migration.
pub fn latest_version() -> MigrationVersion {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

async fn ensure_table(pool: &SqlitePool) -> CoreResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns the highest applied version (0 for an empty database).
pub async fn current_version(pool: &SqlitePool) -> CoreResult<MigrationVersion> {
    ensure_table(pool).await?;
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Applies every migration newer than the current version.
pub async fn run_pending(pool: &SqlitePool) -> CoreResult<MigrationRunResult> {
    let start = current_version(pool).await?;
    let mut version = start;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        apply(pool, migration).await?;
        info!(
            version = migration.version,
            name = migration.name,
            "applied migration"
        );
        version = migration.version;
        applied.push(migration.version);
    }

    Ok(MigrationRunResult {
        applied,
        final_version: version,
    })
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> CoreResult<()> {
    let failed = |e: sqlx::Error| {
        CoreError::migration(format!(
            "{} ({}): {e}",
            migration.name, migration.version
        ))
    };

    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
    }
    sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(now_millis())
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::Database;

    #[test]
    fn versions_strictly_increase() {
        let versions: Vec<_> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.first(), Some(&1));
        assert_eq!(latest_version(), *versions.last().unwrap());
    }

    #[tokio::test]
    async fn run_pending_applies_everything_once() {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        assert_eq!(current_version(db.pool()).await.unwrap(), 0);

        let first = run_pending(db.pool()).await.unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.final_version, latest_version());

        let second = run_pending(db.pool()).await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.final_version, latest_version());
    }

    #[tokio::test]
    async fn migration_records_names() {
        let db = Database::in_memory().await.unwrap();
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM schema_migrations ORDER BY version")
                .fetch_all(db.pool())
                .await
                .unwrap();
        let expected: Vec<_> = MIGRATIONS.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, expected);
    }
}
