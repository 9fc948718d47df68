//! Database statistics.

use crate::db::Database;
use crate::error::CoreResult;
use crate::migration::MigrationVersion;
use serde::Serialize;

/// Row counts per table, plus the schema version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Registered users.
    pub users: i64,
    /// Courses.
    pub courses: i64,
    /// Resources in any state.
    pub resources: i64,
    /// Resources waiting for review.
    pub pending_resources: i64,
    /// Ratings of courses and resources.
    pub ratings: i64,
    /// Comments.
    pub comments: i64,
    /// Favorites.
    pub favorites: i64,
    /// Review records.
    pub reviews: i64,
    /// Applied schema version.
    pub schema_version: MigrationVersion,
}

impl Database {
    /// Collects table statistics.
    pub async fn stats(&self) -> CoreResult<DatabaseStats> {
        let (users, courses, resources, pending_resources, ratings, comments, favorites, reviews): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
                "SELECT \
                 (SELECT COUNT(*) FROM users), \
                 (SELECT COUNT(*) FROM courses), \
                 (SELECT COUNT(*) FROM resources), \
                 (SELECT COUNT(*) FROM resources WHERE status = 'pending'), \
                 (SELECT COUNT(*) FROM ratings), \
                 (SELECT COUNT(*) FROM comments), \
                 (SELECT COUNT(*) FROM favorites), \
                 (SELECT COUNT(*) FROM review_records)",
            )
            .fetch_one(self.pool())
            .await?;

        Ok(DatabaseStats {
            users,
            courses,
            resources,
            pending_resources,
            ratings,
            comments,
            favorites,
            reviews,
            schema_version: self.schema_version().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::latest_version;

    #[tokio::test]
    async fn empty_database() {
        let db = Database::in_memory().await.unwrap();
        let stats = db.stats().await.unwrap();
        assert_eq!(stats.users, 0);
        assert_eq!(stats.resources, 0);
        assert_eq!(stats.schema_version, latest_version());
    }

    #[tokio::test]
    async fn counts_rows() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES (1, 'ada', 'ada@example.edu', 'x', 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO courses (id, code, name, created_at, updated_at) VALUES (1, 'CS101', 'Intro', 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();
        for status in ["pending", "approved", "pending"] {
            sqlx::query(
                "INSERT INTO resources (course_id, uploader_id, title, url, status, created_at, updated_at) \
                 VALUES (1, 1, 't', 'https://x', ?, 0, 0)",
            )
            .bind(status)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.courses, 1);
        assert_eq!(stats.resources, 3);
        assert_eq!(stats.pending_resources, 2);
        assert_eq!(stats.comments, 0);
    }
}
