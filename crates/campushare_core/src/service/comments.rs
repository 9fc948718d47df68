use super::fetch_approved_resource;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{Comment, NewComment};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, CommentId, ResourceId, UserId};
use tracing::info;

const COMMENT_SELECT: &str = "SELECT c.id, c.resource_id, c.user_id, u.username AS author_username, \
     c.parent_id, c.content, c.created_at FROM comments c JOIN users u ON u.id = c.user_id";

/// Comments on approved resources.
#[derive(Debug, Clone)]
pub struct CommentService {
    db: Database,
}

impl CommentService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Posts a comment. Requires `Comment`; the resource must be approved.
    ///
    /// A reply's parent must be a comment on the same resource.
    pub async fn create(
        &self,
        actor: &Actor,
        resource_id: ResourceId,
        input: NewComment,
    ) -> CoreResult<Comment> {
        actor.require(Permission::Comment)?;
        input.validate()?;

        let mut tx = self.db.begin_write().await?;
        fetch_approved_resource(&mut *tx, resource_id).await?;

        if let Some(parent_id) = input.parent_id {
            let parent_resource: Option<ResourceId> =
                sqlx::query_scalar("SELECT resource_id FROM comments WHERE id = ?")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            match parent_resource {
                None => return Err(CoreError::not_found("comment", parent_id)),
                Some(other) if other != resource_id => {
                    return Err(CoreError::validation(
                        "parent_id",
                        "belongs to a different resource",
                    ))
                }
                Some(_) => {}
            }
        }

        let id = sqlx::query(
            "INSERT INTO comments (resource_id, user_id, parent_id, content, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(resource_id)
        .bind(actor.user_id)
        .bind(input.parent_id)
        .bind(input.content.trim())
        .bind(now_millis())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE resources SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(comment_id = id, resource_id, user_id = actor.user_id, "comment posted");
        self.get(id).await
    }

    /// Loads a comment.
    pub async fn get(&self, id: CommentId) -> CoreResult<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CoreError::not_found("comment", id))
    }

    /// Lists the comments of an approved resource, oldest first.
    pub async fn list(&self, resource_id: ResourceId, page: PageRequest) -> CoreResult<Page<Comment>> {
        fetch_approved_resource(self.db.pool(), resource_id).await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE resource_id = ?")
            .bind(resource_id)
            .fetch_one(self.db.pool())
            .await?;

        let sql = format!(
            "{COMMENT_SELECT} WHERE c.resource_id = ? \
             ORDER BY c.created_at ASC, c.id ASC LIMIT ? OFFSET ?"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(resource_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(comments, total, page))
    }

    /// Deletes a comment and its replies. Allowed for the author and
    /// moderators.
    pub async fn delete(&self, actor: &Actor, id: CommentId) -> CoreResult<()> {
        let mut tx = self.db.begin_write().await?;
        let row: Option<(UserId, ResourceId)> =
            sqlx::query_as("SELECT user_id, resource_id FROM comments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((author, resource_id)) = row else {
            return Err(CoreError::not_found("comment", id));
        };
        actor.require_owner_or(author, Permission::ModerateComments)?;

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE resources SET comment_count = \
             (SELECT COUNT(*) FROM comments WHERE resource_id = ?) WHERE id = ?",
        )
        .bind(resource_id)
        .bind(resource_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(comment_id = id, resource_id, actor = actor.user_id, "comment deleted");
        Ok(())
    }
}
