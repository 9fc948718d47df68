use super::fetch_approved_resource;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{validate_score, Rating, RatingSummary};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, RatingTarget};
use sqlx::SqliteConnection;
use tracing::debug;

const RATING_COLUMNS: &str =
    "id, user_id, target_kind, target_id, score, created_at, updated_at";

/// Ratings of courses and resources.
///
/// Every change recomputes the target's `rating_avg` and `rating_count` in
/// the same transaction, so the stored aggregate always matches the rows.
#[derive(Debug, Clone)]
pub struct RatingService {
    db: Database,
}

impl RatingService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Sets the actor's score for `target`, replacing an earlier one.
    ///
    /// Requires `RateContent`. Resources must be approved.
    pub async fn rate(
        &self,
        actor: &Actor,
        target: RatingTarget,
        score: i64,
    ) -> CoreResult<RatingSummary> {
        actor.require(Permission::RateContent)?;
        validate_score(score)?;

        let mut tx = self.db.begin_write().await?;
        ensure_target(&mut tx, target).await?;

        let now = now_millis();
        sqlx::query(
            "INSERT INTO ratings (user_id, target_kind, target_id, score, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, target_kind, target_id) \
             DO UPDATE SET score = excluded.score, updated_at = excluded.updated_at",
        )
        .bind(actor.user_id)
        .bind(target.kind())
        .bind(target.id())
        .bind(score)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let summary = recalculate(&mut tx, target).await?;
        tx.commit().await?;

        debug!(user_id = actor.user_id, %target, score, average = summary.average, "rated");
        Ok(summary)
    }

    /// Removes the actor's rating of `target`. Returns whether one existed.
    pub async fn remove(&self, actor: &Actor, target: RatingTarget) -> CoreResult<bool> {
        let mut tx = self.db.begin_write().await?;
        let removed = sqlx::query(
            "DELETE FROM ratings WHERE user_id = ? AND target_kind = ? AND target_id = ?",
        )
        .bind(actor.user_id)
        .bind(target.kind())
        .bind(target.id())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if removed {
            recalculate(&mut tx, target).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// Returns the actor's rating of `target`, if any.
    pub async fn get_mine(&self, actor: &Actor, target: RatingTarget) -> CoreResult<Option<Rating>> {
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM ratings \
             WHERE user_id = ? AND target_kind = ? AND target_id = ?"
        );
        let rating = sqlx::query_as::<_, Rating>(&sql)
            .bind(actor.user_id)
            .bind(target.kind())
            .bind(target.id())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(rating)
    }

    /// Lists the ratings of `target`, most recently changed first.
    pub async fn list(&self, target: RatingTarget, page: PageRequest) -> CoreResult<Page<Rating>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ratings WHERE target_kind = ? AND target_id = ?",
        )
        .bind(target.kind())
        .bind(target.id())
        .fetch_one(self.db.pool())
        .await?;

        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE target_kind = ? AND target_id = ? \
             ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let ratings = sqlx::query_as::<_, Rating>(&sql)
            .bind(target.kind())
            .bind(target.id())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(ratings, total, page))
    }
}

async fn ensure_target(conn: &mut SqliteConnection, target: RatingTarget) -> CoreResult<()> {
    match target {
        RatingTarget::Course(id) => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?)")
                    .bind(id)
                    .fetch_one(&mut *conn)
                    .await?;
            if !exists {
                return Err(CoreError::not_found("course", id));
            }
        }
        RatingTarget::Resource(id) => {
            fetch_approved_resource(&mut *conn, id).await?;
        }
    }
    Ok(())
}

/// Recomputes and stores the aggregate of `target` from its rating rows.
async fn recalculate(conn: &mut SqliteConnection, target: RatingTarget) -> CoreResult<RatingSummary> {
    let (total, count): (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(score), 0), COUNT(*) FROM ratings \
         WHERE target_kind = ? AND target_id = ?",
    )
    .bind(target.kind())
    .bind(target.id())
    .fetch_one(&mut *conn)
    .await?;

    let summary = RatingSummary::from_totals(total, count);
    let sql = format!(
        "UPDATE {} SET rating_avg = ?, rating_count = ? WHERE id = ?",
        target.table()
    );
    sqlx::query(&sql)
        .bind(summary.average)
        .bind(summary.count)
        .bind(target.id())
        .execute(&mut *conn)
        .await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    async fn setup() -> (RatingService, i64, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        for id in 1..=3 {
            sqlx::query(
                "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
                 VALUES (?, ?, ?, 'x', 0, 0)",
            )
            .bind(id)
            .bind(format!("user{id}"))
            .bind(format!("user{id}@example.edu"))
            .execute(db.pool())
            .await
            .unwrap();
        }
        let course = sqlx::query(
            "INSERT INTO courses (code, name, created_at, updated_at) VALUES ('CS101', 'Intro', 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        let mut ids = Vec::new();
        for status in ["approved", "pending"] {
            let id = sqlx::query(
                "INSERT INTO resources (course_id, uploader_id, title, url, status, created_at, updated_at) \
                 VALUES (?, 1, 't', 'https://x', ?, 0, 0)",
            )
            .bind(course)
            .bind(status)
            .execute(db.pool())
            .await
            .unwrap()
            .last_insert_rowid();
            ids.push(id);
        }
        (RatingService::new(db), course, ids[0], ids[1])
    }

    fn student(id: i64) -> Actor {
        Actor::new(id, Role::Student)
    }

    async fn stored(service: &RatingService, table: &str, id: i64) -> (f64, i64) {
        let sql = format!("SELECT rating_avg, rating_count FROM {table} WHERE id = ?");
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(service.db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn averages_follow_every_change() {
        let (ratings, course, _, _) = setup().await;
        let target = RatingTarget::Course(course);

        ratings.rate(&student(1), target, 5).await.unwrap();
        ratings.rate(&student(2), target, 4).await.unwrap();
        let summary = ratings.rate(&student(3), target, 2).await.unwrap();
        assert_eq!(summary.average, 3.67);
        assert_eq!(summary.count, 3);
        assert_eq!(stored(&ratings, "courses", course).await, (3.67, 3));

        // Re-rating replaces the old score.
        let summary = ratings.rate(&student(3), target, 3).await.unwrap();
        assert_eq!(summary.average, 4.0);
        assert_eq!(summary.count, 3);

        assert!(ratings.remove(&student(1), target).await.unwrap());
        assert!(!ratings.remove(&student(1), target).await.unwrap());
        assert_eq!(stored(&ratings, "courses", course).await, (3.5, 2));

        ratings.remove(&student(2), target).await.unwrap();
        ratings.remove(&student(3), target).await.unwrap();
        assert_eq!(stored(&ratings, "courses", course).await, (0.0, 0));
    }

    #[tokio::test]
    async fn resource_ratings_need_approval() {
        let (ratings, _, approved, pending) = setup().await;
        let summary = ratings
            .rate(&student(2), RatingTarget::Resource(approved), 5)
            .await
            .unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(stored(&ratings, "resources", approved).await, (5.0, 1));

        assert!(matches!(
            ratings
                .rate(&student(2), RatingTarget::Resource(pending), 5)
                .await,
            Err(CoreError::Conflict { .. })
        ));
        assert!(matches!(
            ratings.rate(&student(2), RatingTarget::Resource(999), 5).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_scores_are_rejected() {
        let (ratings, course, _, _) = setup().await;
        for score in [0, 6, -1] {
            assert!(matches!(
                ratings
                    .rate(&student(1), RatingTarget::Course(course), score)
                    .await,
                Err(CoreError::Validation { field: "score", .. })
            ));
        }
        assert!(matches!(
            ratings.rate(&student(1), RatingTarget::Course(77), 3).await,
            Err(CoreError::NotFound {
                entity: "course",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn mine_and_list() {
        let (ratings, course, approved, _) = setup().await;
        let target = RatingTarget::Course(course);
        assert!(ratings.get_mine(&student(1), target).await.unwrap().is_none());

        ratings.rate(&student(1), target, 4).await.unwrap();
        ratings.rate(&student(2), target, 2).await.unwrap();
        ratings
            .rate(&student(1), RatingTarget::Resource(approved), 1)
            .await
            .unwrap();

        let mine = ratings.get_mine(&student(1), target).await.unwrap().unwrap();
        assert_eq!(mine.score, 4);

        let page = ratings.list(target, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|r| r.target_id == course));
    }
}
