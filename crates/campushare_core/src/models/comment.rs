use super::validate;
use crate::error::CoreResult;
use crate::types::{CommentId, ResourceId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// A comment on a resource, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Comment {
    /// Comment id.
    pub id: CommentId,
    /// Resource commented on.
    pub resource_id: ResourceId,
    /// Author.
    pub user_id: UserId,
    /// Author's username at read time.
    pub author_username: String,
    /// Comment this one replies to.
    pub parent_id: Option<CommentId>,
    /// Text.
    pub content: String,
    /// Posting time.
    pub created_at: Timestamp,
}

/// Input for posting a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    /// Text.
    pub content: String,
    /// Comment to reply to.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    /// Validates the text, ignoring surrounding whitespace.
    pub fn validate(&self) -> CoreResult<()> {
        validate::length("content", self.content.trim(), 1, MAX_COMMENT_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_bounds() {
        let ok = NewComment {
            content: "useful, thanks".into(),
            parent_id: None,
        };
        assert!(ok.validate().is_ok());

        let blank = NewComment {
            content: " \n ".into(),
            parent_id: None,
        };
        assert!(blank.validate().is_err());

        let long = NewComment {
            content: "x".repeat(MAX_COMMENT_LENGTH + 1),
            parent_id: Some(1),
        };
        assert!(long.validate().is_err());
    }
}
