use super::validate;
use crate::error::{CoreError, CoreResult};
use crate::types::{CourseId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A course resources are shared for.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Course {
    /// Course id.
    pub id: CourseId,
    /// Unique course code, e.g. `CS101`.
    pub code: String,
    /// Course name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Name of the lecturer.
    pub teacher_name: String,
    /// Department offering the course.
    pub department: String,
    /// Credit points.
    pub credits: f64,
    /// Semester, e.g. `2024-fall`.
    pub semester: String,
    /// User who created the course.
    pub created_by: Option<UserId>,
    /// Mean rating, rounded to two decimals.
    pub rating_avg: f64,
    /// Number of ratings.
    pub rating_count: i64,
    /// Number of approved resources.
    pub resource_count: i64,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

/// Input for creating a course.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCourse {
    /// Unique course code.
    pub code: String,
    /// Course name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Lecturer.
    #[serde(default)]
    pub teacher_name: String,
    /// Department.
    #[serde(default)]
    pub department: String,
    /// Credit points.
    #[serde(default)]
    pub credits: f64,
    /// Semester.
    #[serde(default)]
    pub semester: String,
}

impl NewCourse {
    /// Trims the text fields.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.code,
            &mut self.name,
            &mut self.teacher_name,
            &mut self.department,
            &mut self.semester,
        ] {
            *field = field.trim().to_string();
        }
        self
    }

    /// Validates all fields.
    pub fn validate(&self) -> CoreResult<()> {
        validate::length("code", &self.code, 1, 32)?;
        validate::length("name", &self.name, 1, 128)?;
        validate::length("description", &self.description, 0, 2000)?;
        validate::length("teacher_name", &self.teacher_name, 0, 64)?;
        validate::length("department", &self.department, 0, 64)?;
        validate::length("semester", &self.semester, 0, 32)?;
        validate_credits(self.credits)
    }
}

/// Course changes. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourse {
    /// New code.
    #[serde(default)]
    pub code: Option<String>,
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New lecturer.
    #[serde(default)]
    pub teacher_name: Option<String>,
    /// New department.
    #[serde(default)]
    pub department: Option<String>,
    /// New credit points.
    #[serde(default)]
    pub credits: Option<f64>,
    /// New semester.
    #[serde(default)]
    pub semester: Option<String>,
}

impl UpdateCourse {
    /// Applies the changes to `course`, validating the result.
    pub fn apply_to(self, course: &mut Course) -> CoreResult<()> {
        let merged = NewCourse {
            code: self.code.unwrap_or_else(|| course.code.clone()),
            name: self.name.unwrap_or_else(|| course.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| course.description.clone()),
            teacher_name: self
                .teacher_name
                .unwrap_or_else(|| course.teacher_name.clone()),
            department: self
                .department
                .unwrap_or_else(|| course.department.clone()),
            credits: self.credits.unwrap_or(course.credits),
            semester: self.semester.unwrap_or_else(|| course.semester.clone()),
        }
        .normalized();
        merged.validate()?;

        course.code = merged.code;
        course.name = merged.name;
        course.description = merged.description;
        course.teacher_name = merged.teacher_name;
        course.department = merged.department;
        course.credits = merged.credits;
        course.semester = merged.semester;
        Ok(())
    }
}

fn validate_credits(credits: f64) -> CoreResult<()> {
    if credits.is_finite() && (0.0..=20.0).contains(&credits) {
        Ok(())
    } else {
        Err(CoreError::validation("credits", "must be between 0 and 20"))
    }
}

/// Ordering of course listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSort {
    /// Newest first.
    #[default]
    Latest,
    /// Best rated first.
    Rating,
    /// Most resources first.
    Popular,
}

impl CourseSort {
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            CourseSort::Latest => "created_at DESC, id DESC",
            CourseSort::Rating => "rating_avg DESC, rating_count DESC, id DESC",
            CourseSort::Popular => "resource_count DESC, rating_count DESC, id DESC",
        }
    }
}

/// Filter for listing courses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    /// Substring of code, name or lecturer.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Exact department.
    #[serde(default)]
    pub department: Option<String>,
    /// Exact semester.
    #[serde(default)]
    pub semester: Option<String>,
    /// Ordering.
    #[serde(default)]
    pub sort: CourseSort,
}
