use super::{
    fetch_resource, keyword, push_keyword, refresh_course_resource_count, RESOURCE_COLUMNS,
};
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{NewResource, Resource, ResourceFilter, UpdateResource};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, ResourceId, ResourceStatus, TargetKind};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

/// Shared resources and their visibility rules.
///
/// Approved resources are public. Pending and rejected ones are visible to
/// their uploader and to reviewers only; everyone else gets `NotFound`.
#[derive(Debug, Clone)]
pub struct ResourceService {
    db: Database,
}

fn visible_to(resource: &Resource, viewer: Option<&Actor>) -> bool {
    resource.is_approved()
        || viewer.is_some_and(|actor| {
            actor.is_owner(resource.uploader_id) || actor.can(Permission::ReviewResources)
        })
}

impl ResourceService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Shares a resource. Requires `UploadResource`.
    ///
    /// Uploads by reviewers are approved right away; all others wait for review.
    pub async fn create(&self, actor: &Actor, input: NewResource) -> CoreResult<Resource> {
        actor.require(Permission::UploadResource)?;
        let input = input.normalized();
        input.validate()?;

        let status = if actor.can(Permission::ReviewResources) {
            ResourceStatus::Approved
        } else {
            ResourceStatus::Pending
        };

        let mut tx = self.db.begin_write().await?;
        let course_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?)")
                .bind(input.course_id)
                .fetch_one(&mut *tx)
                .await?;
        if !course_exists {
            return Err(CoreError::not_found("course", input.course_id));
        }

        let now = now_millis();
        let id = sqlx::query(
            "INSERT INTO resources (course_id, uploader_id, title, description, kind, url, \
             file_size, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.course_id)
        .bind(actor.user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.kind)
        .bind(&input.url)
        .bind(input.file_size)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if status == ResourceStatus::Approved {
            refresh_course_resource_count(&mut *tx, input.course_id).await?;
        }
        tx.commit().await?;

        info!(
            resource_id = id,
            course_id = input.course_id,
            uploader = actor.user_id,
            %status,
            "resource created"
        );
        fetch_resource(self.db.pool(), id).await
    }

    /// Loads a resource the viewer may see.
    pub async fn get(&self, viewer: Option<&Actor>, id: ResourceId) -> CoreResult<Resource> {
        let resource = fetch_resource(self.db.pool(), id).await?;
        if !visible_to(&resource, viewer) {
            return Err(CoreError::not_found("resource", id));
        }
        Ok(resource)
    }

    /// Lists resources.
    ///
    /// Viewers without `ReviewResources` only see approved resources, unless
    /// they filter by their own uploads.
    pub async fn list(
        &self,
        viewer: Option<&Actor>,
        filter: &ResourceFilter,
        page: PageRequest,
    ) -> CoreResult<Page<Resource>> {
        let reviewer = viewer.is_some_and(|a| a.can(Permission::ReviewResources));
        let own = viewer.is_some_and(|a| filter.uploader_id == Some(a.user_id));
        let status = if reviewer || own {
            filter.status
        } else {
            Some(ResourceStatus::Approved)
        };

        let mut count =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM resources r WHERE 1 = 1");
        push_filters(&mut count, filter, status);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.db.pool())
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources r WHERE 1 = 1"
        ));
        push_filters(&mut query, filter, status);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let resources = query
            .build_query_as::<Resource>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(resources, total, page))
    }

    /// Edits a resource. Allowed for the uploader and reviewers.
    ///
    /// Edits by anyone without `ReviewResources` send the resource back to
    /// review; reviewer edits leave the status alone.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ResourceId,
        update: UpdateResource,
    ) -> CoreResult<Resource> {
        let mut tx = self.db.begin_write().await?;
        let mut resource = fetch_resource(&mut *tx, id).await?;
        if !visible_to(&resource, Some(actor)) {
            return Err(CoreError::not_found("resource", id));
        }
        actor.require_owner_or(resource.uploader_id, Permission::ReviewResources)?;
        update.apply_to(&mut resource)?;
        if !actor.can(Permission::ReviewResources) {
            resource.status = ResourceStatus::Pending;
        }

        sqlx::query(
            "UPDATE resources SET title = ?, description = ?, kind = ?, url = ?, file_size = ?, \
             status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(resource.kind)
        .bind(&resource.url)
        .bind(resource.file_size)
        .bind(resource.status)
        .bind(now_millis())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        refresh_course_resource_count(&mut *tx, resource.course_id).await?;
        let resource = fetch_resource(&mut *tx, id).await?;
        tx.commit().await?;

        info!(resource_id = id, actor = actor.user_id, status = %resource.status, "resource updated");
        Ok(resource)
    }

    /// Deletes a resource with its ratings, comments, favorites and review
    /// records. Allowed for the uploader and reviewers.
    pub async fn delete(&self, actor: &Actor, id: ResourceId) -> CoreResult<()> {
        let mut tx = self.db.begin_write().await?;
        let resource = fetch_resource(&mut *tx, id).await?;
        if !visible_to(&resource, Some(actor)) {
            return Err(CoreError::not_found("resource", id));
        }
        actor.require_owner_or(resource.uploader_id, Permission::ReviewResources)?;

        sqlx::query("DELETE FROM ratings WHERE target_kind = ? AND target_id = ?")
            .bind(TargetKind::Resource)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        // Comments, favorites and review records go with the row.
        sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_course_resource_count(&mut *tx, resource.course_id).await?;
        tx.commit().await?;

        info!(resource_id = id, actor = actor.user_id, "resource deleted");
        Ok(())
    }

    /// Counts a view.
    pub async fn record_view(&self, id: ResourceId) -> CoreResult<()> {
        self.bump(id, "view_count").await
    }

    /// Counts a download.
    pub async fn record_download(&self, id: ResourceId) -> CoreResult<()> {
        self.bump(id, "download_count").await
    }

    async fn bump(&self, id: ResourceId, column: &'static str) -> CoreResult<()> {
        let sql = format!("UPDATE resources SET {column} = {column} + 1 WHERE id = ?");
        let done = sqlx::query(&sql)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if done.rows_affected() == 0 {
            return Err(CoreError::not_found("resource", id));
        }
        debug!(resource_id = id, column, "counter bumped");
        Ok(())
    }

    /// Returns the download URL of a resource the viewer may see.
    pub async fn download_url(&self, viewer: Option<&Actor>, id: ResourceId) -> CoreResult<String> {
        Ok(self.get(viewer, id).await?.url)
    }
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    filter: &ResourceFilter,
    status: Option<ResourceStatus>,
) {
    if let Some(course_id) = filter.course_id {
        qb.push(" AND r.course_id = ").push_bind(course_id);
    }
    if let Some(uploader_id) = filter.uploader_id {
        qb.push(" AND r.uploader_id = ").push_bind(uploader_id);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND r.kind = ").push_bind(kind.as_str());
    }
    if let Some(status) = status {
        qb.push(" AND r.status = ").push_bind(status.as_str());
    }
    if let Some(keyword) = keyword(&filter.keyword) {
        push_keyword(qb, &["r.title", "r.description"], keyword);
    }
}
