use super::{keyword, push_keyword};
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{Course, CourseFilter, NewCourse, UpdateCourse};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, CourseId, TargetKind};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

const COURSE_COLUMNS: &str = "id, code, name, description, teacher_name, department, credits, \
     semester, created_by, rating_avg, rating_count, resource_count, created_at, updated_at";

/// Course catalogue.
#[derive(Debug, Clone)]
pub struct CourseService {
    db: Database,
}

impl CourseService {
    /// Creates the service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a course. Requires `ManageCourses`.
    pub async fn create(&self, actor: &Actor, input: NewCourse) -> CoreResult<Course> {
        actor.require(Permission::ManageCourses)?;
        let input = input.normalized();
        input.validate()?;
        if self.code_taken(&input.code, None).await? {
            return Err(CoreError::already_exists("course", "code"));
        }

        let now = now_millis();
        let id = sqlx::query(
            "INSERT INTO courses (code, name, description, teacher_name, department, credits, \
             semester, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.teacher_name)
        .bind(&input.department)
        .bind(input.credits)
        .bind(&input.semester)
        .bind(actor.user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(duplicate_code)?
        .last_insert_rowid();

        info!(course_id = id, code = %input.code, actor = actor.user_id, "course created");
        self.get(id).await
    }

    async fn code_taken(&self, code: &str, except: Option<CourseId>) -> CoreResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE code = ? AND id != ?)")
                .bind(code)
                .bind(except.unwrap_or(0))
                .fetch_one(self.db.pool())
                .await?;
        Ok(taken)
    }

    /// Loads a course.
    pub async fn get(&self, id: CourseId) -> CoreResult<Course> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?");
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CoreError::not_found("course", id))
    }

    /// Lists courses.
    pub async fn list(&self, filter: &CourseFilter, page: PageRequest) -> CoreResult<Page<Course>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM courses WHERE 1 = 1");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.db.pool())
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE 1 = 1"
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let courses = query
            .build_query_as::<Course>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(courses, total, page))
    }

    /// Edits a course.
    ///
    /// Requires `ManageCourses`, and the actor must have created the course
    /// unless they also hold `DeleteCourses`.
    pub async fn update(
        &self,
        actor: &Actor,
        id: CourseId,
        update: UpdateCourse,
    ) -> CoreResult<Course> {
        actor.require(Permission::ManageCourses)?;
        let mut course = self.get(id).await?;
        let is_creator = course.created_by == Some(actor.user_id);
        if !is_creator && !actor.can(Permission::DeleteCourses) {
            return Err(CoreError::permission_denied("edit a course created by someone else"));
        }

        update.apply_to(&mut course)?;
        if self.code_taken(&course.code, Some(id)).await? {
            return Err(CoreError::already_exists("course", "code"));
        }

        sqlx::query(
            "UPDATE courses SET code = ?, name = ?, description = ?, teacher_name = ?, \
             department = ?, credits = ?, semester = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&course.code)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.teacher_name)
        .bind(&course.department)
        .bind(course.credits)
        .bind(&course.semester)
        .bind(now_millis())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(duplicate_code)?;

        info!(course_id = id, actor = actor.user_id, "course updated");
        self.get(id).await
    }

    /// Deletes a course with no resources. Requires `DeleteCourses`.
    pub async fn delete(&self, actor: &Actor, id: CourseId) -> CoreResult<()> {
        actor.require(Permission::DeleteCourses)?;

        let mut tx = self.db.begin_write().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(CoreError::not_found("course", id));
        }
        let resources: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE course_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if resources > 0 {
            return Err(CoreError::conflict(format!(
                "course {id} still has {resources} resource(s)"
            )));
        }

        sqlx::query("DELETE FROM ratings WHERE target_kind = ? AND target_id = ?")
            .bind(TargetKind::Course)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(course_id = id, actor = actor.user_id, "course deleted");
        Ok(())
    }
}

/// The pre-check can lose a race with a concurrent writer; the unique index
/// has the final say.
fn duplicate_code(err: sqlx::Error) -> CoreError {
    let err = CoreError::from(err);
    if err.is_unique_violation() {
        CoreError::already_exists("course", "code")
    } else {
        err
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CourseFilter) {
    if let Some(keyword) = keyword(&filter.keyword) {
        push_keyword(qb, &["code", "name", "teacher_name"], keyword);
    }
    if let Some(department) = keyword(&filter.department) {
        qb.push(" AND department = ")
            .push_bind(department.to_string());
    }
    if let Some(semester) = keyword(&filter.semester) {
        qb.push(" AND semester = ").push_bind(semester.to_string());
    }
}
