use super::{fetch_resource, refresh_course_resource_count, RESOURCE_COLUMNS};
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{NewReview, Resource, ReviewRecord};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, ResourceId, ResourceStatus, ReviewId};
use tracing::info;

const REVIEW_SELECT: &str = "SELECT v.id, v.resource_id, v.reviewer_id, \
     u.username AS reviewer_username, v.decision, v.reason, v.created_at \
     FROM review_records v JOIN users u ON u.id = v.reviewer_id";

/// Moderation of shared resources.
#[derive(Debug, Clone)]
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Approves or rejects a resource. Requires `ReviewResources`.
    ///
    /// The record, the new status and the course's resource count are
    /// written in one transaction. Reviewing an already reviewed resource
    /// is allowed and overrides the earlier decision.
    pub async fn review(
        &self,
        actor: &Actor,
        resource_id: ResourceId,
        input: NewReview,
    ) -> CoreResult<ReviewRecord> {
        actor.require(Permission::ReviewResources)?;
        input.validate()?;
        let status = input.decision.resulting_status();

        let mut tx = self.db.begin_write().await?;
        let resource = fetch_resource(&mut *tx, resource_id).await?;

        let now = now_millis();
        let id = sqlx::query(
            "INSERT INTO review_records (resource_id, reviewer_id, decision, reason, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(resource_id)
        .bind(actor.user_id)
        .bind(input.decision)
        .bind(input.reason())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE resources SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        refresh_course_resource_count(&mut *tx, resource.course_id).await?;
        tx.commit().await?;

        info!(
            resource_id,
            reviewer = actor.user_id,
            decision = %input.decision,
            previous = %resource.status,
            "resource reviewed"
        );
        self.get(id).await
    }

    async fn get(&self, id: ReviewId) -> CoreResult<ReviewRecord> {
        let sql = format!("{REVIEW_SELECT} WHERE v.id = ?");
        sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CoreError::not_found("review", id))
    }

    /// Review history of a resource, newest first.
    ///
    /// Visible to reviewers and to the resource's uploader. Anyone else gets
    /// `NotFound` for a resource that is not approved, like everywhere else.
    pub async fn history(
        &self,
        actor: &Actor,
        resource_id: ResourceId,
    ) -> CoreResult<Vec<ReviewRecord>> {
        let resource = fetch_resource(self.db.pool(), resource_id).await?;
        let allowed =
            actor.is_owner(resource.uploader_id) || actor.can(Permission::ReviewResources);
        if !allowed && !resource.is_approved() {
            return Err(CoreError::not_found("resource", resource_id));
        }
        actor.require_owner_or(resource.uploader_id, Permission::ReviewResources)?;

        let sql = format!("{REVIEW_SELECT} WHERE v.resource_id = ? ORDER BY v.created_at DESC, v.id DESC");
        let records = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(resource_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(records)
    }

    /// Resources waiting for review, oldest first. Requires `ReviewResources`.
    pub async fn pending(&self, actor: &Actor, page: PageRequest) -> CoreResult<Page<Resource>> {
        actor.require(Permission::ReviewResources)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE status = ?")
            .bind(ResourceStatus::Pending)
            .fetch_one(self.db.pool())
            .await?;

        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources r WHERE r.status = ? \
             ORDER BY r.created_at ASC, r.id ASC LIMIT ? OFFSET ?"
        );
        let resources = sqlx::query_as::<_, Resource>(&sql)
            .bind(ResourceStatus::Pending)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(resources, total, page))
    }
}
