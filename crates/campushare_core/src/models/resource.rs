use super::validate;
use crate::error::{CoreError, CoreResult};
use crate::types::{CourseId, ResourceId, ResourceKind, ResourceStatus, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A shared study resource. The file itself lives at `url`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Resource {
    /// Resource id.
    pub id: ResourceId,
    /// Course the resource belongs to.
    pub course_id: CourseId,
    /// User who shared it.
    pub uploader_id: UserId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Kind of content.
    pub kind: ResourceKind,
    /// Where the file can be fetched.
    pub url: String,
    /// Size of the file in bytes, 0 if unknown.
    pub file_size: i64,
    /// Moderation state.
    pub status: ResourceStatus,
    /// Times viewed.
    pub view_count: i64,
    /// Times downloaded.
    pub download_count: i64,
    /// Times favorited.
    pub favorite_count: i64,
    /// Number of comments.
    pub comment_count: i64,
    /// Mean rating, rounded to two decimals.
    pub rating_avg: f64,
    /// Number of ratings.
    pub rating_count: i64,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl Resource {
    /// Returns true once a reviewer approved it.
    pub fn is_approved(&self) -> bool {
        self.status == ResourceStatus::Approved
    }
}

/// Input for sharing a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct NewResource {
    /// Course to share it in.
    pub course_id: CourseId,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Kind of content.
    #[serde(default)]
    pub kind: ResourceKind,
    /// Where the file can be fetched.
    pub url: String,
    /// File size in bytes.
    #[serde(default)]
    pub file_size: i64,
}

impl NewResource {
    /// Trims the text fields.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.url = self.url.trim().to_string();
        self
    }

    /// Validates all fields.
    pub fn validate(&self) -> CoreResult<()> {
        validate::length("title", &self.title, 1, 128)?;
        validate::length("description", &self.description, 0, 2000)?;
        validate::url("url", &self.url)?;
        if self.file_size < 0 {
            return Err(CoreError::validation("file_size", "must not be negative"));
        }
        Ok(())
    }
}

/// Resource changes. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateResource {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New kind.
    #[serde(default)]
    pub kind: Option<ResourceKind>,
    /// New URL.
    #[serde(default)]
    pub url: Option<String>,
    /// New file size.
    #[serde(default)]
    pub file_size: Option<i64>,
}

impl UpdateResource {
    /// Applies the changes to `resource`, validating the result.
    pub fn apply_to(self, resource: &mut Resource) -> CoreResult<()> {
        let merged = NewResource {
            course_id: resource.course_id,
            title: self.title.unwrap_or_else(|| resource.title.clone()),
            description: self
                .description
                .unwrap_or_else(|| resource.description.clone()),
            kind: self.kind.unwrap_or(resource.kind),
            url: self.url.unwrap_or_else(|| resource.url.clone()),
            file_size: self.file_size.unwrap_or(resource.file_size),
        }
        .normalized();
        merged.validate()?;

        resource.title = merged.title;
        resource.description = merged.description;
        resource.kind = merged.kind;
        resource.url = merged.url;
        resource.file_size = merged.file_size;
        Ok(())
    }
}

/// Ordering of resource listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSort {
    /// Newest first.
    #[default]
    Latest,
    /// Best rated first.
    Rating,
    /// Most favorited, then most viewed.
    Popular,
    /// Most downloaded first.
    Downloads,
}

impl ResourceSort {
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            ResourceSort::Latest => "r.created_at DESC, r.id DESC",
            ResourceSort::Rating => "r.rating_avg DESC, r.rating_count DESC, r.id DESC",
            ResourceSort::Popular => "r.favorite_count DESC, r.view_count DESC, r.id DESC",
            ResourceSort::Downloads => "r.download_count DESC, r.id DESC",
        }
    }
}

/// Filter for listing resources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceFilter {
    /// Only this course.
    #[serde(default)]
    pub course_id: Option<CourseId>,
    /// Only resources shared by this user.
    #[serde(default)]
    pub uploader_id: Option<UserId>,
    /// Only this kind.
    #[serde(default)]
    pub kind: Option<ResourceKind>,
    /// Only this moderation state. Ignored for viewers who can't see it.
    #[serde(default)]
    pub status: Option<ResourceStatus>,
    /// Substring of title or description.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Ordering.
    #[serde(default)]
    pub sort: ResourceSort,
}
