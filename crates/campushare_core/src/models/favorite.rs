use super::Resource;
use crate::types::Timestamp;
use serde::Serialize;

/// A resource in a user's favorites, with the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FavoritedResource {
    /// The resource.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub resource: Resource,
    /// When it was favorited.
    pub favorited_at: Timestamp,
}
