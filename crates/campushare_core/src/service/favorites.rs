use super::{fetch_approved_resource, RESOURCE_COLUMNS};
use crate::db::Database;
use crate::error::CoreResult;
use crate::models::FavoritedResource;
use crate::pagination::{Page, PageRequest};
use crate::permission::Actor;
use crate::types::{now_millis, ResourceId, UserId};
use tracing::debug;

/// Users' favorite resources.
///
/// Adding and removing are idempotent; `favorite_count` only moves when a
/// row is actually inserted or deleted.
#[derive(Debug, Clone)]
pub struct FavoriteService {
    db: Database,
}

impl FavoriteService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Favorites an approved resource. Returns true if it was newly added.
    pub async fn add(&self, actor: &Actor, resource_id: ResourceId) -> CoreResult<bool> {
        let mut tx = self.db.begin_write().await?;
        fetch_approved_resource(&mut *tx, resource_id).await?;

        let added = sqlx::query(
            "INSERT OR IGNORE INTO favorites (user_id, resource_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(actor.user_id)
        .bind(resource_id)
        .bind(now_millis())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if added {
            sqlx::query("UPDATE resources SET favorite_count = favorite_count + 1 WHERE id = ?")
                .bind(resource_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(user_id = actor.user_id, resource_id, added, "favorite added");
        Ok(added)
    }

    /// Removes a favorite. Returns true if there was one.
    pub async fn remove(&self, actor: &Actor, resource_id: ResourceId) -> CoreResult<bool> {
        let mut tx = self.db.begin_write().await?;
        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND resource_id = ?")
            .bind(actor.user_id)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            == 1;

        if removed {
            sqlx::query(
                "UPDATE resources SET favorite_count = MAX(favorite_count - 1, 0) WHERE id = ?",
            )
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(user_id = actor.user_id, resource_id, removed, "favorite removed");
        Ok(removed)
    }

    /// Returns true if `user_id` favorited `resource_id`.
    pub async fn is_favorite(&self, user_id: UserId, resource_id: ResourceId) -> CoreResult<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ? AND resource_id = ?)",
        )
        .bind(user_id)
        .bind(resource_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(found)
    }

    /// Lists the approved resources `user_id` favorited, newest favorite first.
    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> CoreResult<Page<FavoritedResource>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM favorites f JOIN resources r ON r.id = f.resource_id \
             WHERE f.user_id = ? AND r.status = 'approved'",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        let sql = format!(
            "SELECT {RESOURCE_COLUMNS}, f.created_at AS favorited_at \
             FROM favorites f JOIN resources r ON r.id = f.resource_id \
             WHERE f.user_id = ? AND r.status = 'approved' \
             ORDER BY f.created_at DESC, f.rowid DESC LIMIT ? OFFSET ?"
        );
        let items = sqlx::query_as::<_, FavoritedResource>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(items, total, page))
    }
}
