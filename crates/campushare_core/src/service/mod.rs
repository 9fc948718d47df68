//! Services: validated, permission-checked operations over the database.
//!
//! Each service holds a clone of the [`Database`] handle. Writes that touch
//! a derived counter (rating averages, resource counts, favorite and comment
//! counts) run inside one transaction together with that counter.
//!
//! Helpers in this module never acquire a pool connection while a caller's
//! transaction is open; in-memory databases have exactly one connection.

mod comments;
mod courses;
mod favorites;
mod ratings;
mod resources;
mod reviews;
mod users;

pub use comments::CommentService;
pub use courses::CourseService;
pub use favorites::FavoriteService;
pub use ratings::RatingService;
pub use resources::ResourceService;
pub use reviews::ReviewService;
pub use users::UserService;

use crate::auth::PasswordHasher;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::Resource;
use crate::types::{now_millis, CourseId, ResourceId, ResourceStatus};
use sqlx::{Executor, QueryBuilder, Sqlite};

/// Column list matching [`Resource`], for queries aliasing `resources` as `r`.
pub(crate) const RESOURCE_COLUMNS: &str = "r.id, r.course_id, r.uploader_id, r.title, \
     r.description, r.kind, r.url, r.file_size, r.status, r.view_count, r.download_count, \
     r.favorite_count, r.comment_count, r.rating_avg, r.rating_count, r.created_at, r.updated_at";

/// All services over one database.
#[derive(Debug, Clone)]
pub struct Services {
    /// Accounts and authentication.
    pub users: UserService,
    /// Courses.
    pub courses: CourseService,
    /// Shared resources.
    pub resources: ResourceService,
    /// Course and resource ratings.
    pub ratings: RatingService,
    /// Resource comments.
    pub comments: CommentService,
    /// Favorites.
    pub favorites: FavoriteService,
    /// Moderation.
    pub reviews: ReviewService,
}

impl Services {
    /// Creates every service over `db`.
    pub fn new(db: Database, hasher: PasswordHasher) -> Self {
        Self {
            users: UserService::new(db.clone(), hasher),
            courses: CourseService::new(db.clone()),
            resources: ResourceService::new(db.clone()),
            ratings: RatingService::new(db.clone()),
            comments: CommentService::new(db.clone()),
            favorites: FavoriteService::new(db.clone()),
            reviews: ReviewService::new(db),
        }
    }
}

/// Turns a search keyword into a `LIKE` pattern, escaping wildcards with `\`.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Returns the keyword if it has any non-blank content.
pub(crate) fn keyword(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

/// Appends `AND (col1 LIKE ? ESCAPE '\' OR col2 LIKE ? ...)`.
pub(crate) fn push_keyword(qb: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], keyword: &str) {
    let pattern = like_pattern(keyword);
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(")");
}

/// Loads a resource by id.
pub(crate) async fn fetch_resource<'e, E>(executor: E, id: ResourceId) -> CoreResult<Resource>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources r WHERE r.id = ?");
    sqlx::query_as::<_, Resource>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("resource", id))
}

/// Loads a resource and fails unless it is approved.
pub(crate) async fn fetch_approved_resource<'e, E>(
    executor: E,
    id: ResourceId,
) -> CoreResult<Resource>
where
    E: Executor<'e, Database = Sqlite>,
{
    let resource = fetch_resource(executor, id).await?;
    if resource.status != ResourceStatus::Approved {
        return Err(CoreError::conflict(format!("resource {id} is not approved")));
    }
    Ok(resource)
}

/// Recomputes `courses.resource_count` from the approved resources.
pub(crate) async fn refresh_course_resource_count<'e, E>(
    executor: E,
    course_id: CourseId,
) -> CoreResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE courses SET resource_count = \
         (SELECT COUNT(*) FROM resources WHERE course_id = ? AND status = 'approved'), \
         updated_at = ? WHERE id = ?",
    )
    .bind(course_id)
    .bind(now_millis())
    .bind(course_id)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("algebra"), "%algebra%");
        assert_eq!(like_pattern(" 100% "), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }

    #[test]
    fn blank_keywords_are_ignored() {
        assert_eq!(keyword(&None), None);
        assert_eq!(keyword(&Some("   ".into())), None);
        assert_eq!(keyword(&Some(" cs ".into())), Some("cs"));
    }

    #[test]
    fn keyword_clause_binds_each_column() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1 FROM t WHERE 1 = 1");
        push_keyword(&mut qb, &["a", "b"], "x");
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM t WHERE 1 = 1 AND (a LIKE ? ESCAPE '\\' OR b LIKE ? ESCAPE '\\')"
        );
    }
}
