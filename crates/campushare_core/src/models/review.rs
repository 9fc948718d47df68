use super::validate;
use crate::error::{CoreError, CoreResult};
use crate::types::{ResourceId, ReviewDecision, ReviewId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A moderation decision on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReviewRecord {
    /// Record id.
    pub id: ReviewId,
    /// Reviewed resource.
    pub resource_id: ResourceId,
    /// Reviewer.
    pub reviewer_id: UserId,
    /// Reviewer's username at read time.
    pub reviewer_username: String,
    /// Outcome.
    pub decision: ReviewDecision,
    /// Reason given, empty for approvals without one.
    pub reason: String,
    /// Decision time.
    pub created_at: Timestamp,
}

/// Input for reviewing a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    /// Outcome.
    pub decision: ReviewDecision,
    /// Reason; required when rejecting.
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewReview {
    /// Returns the trimmed reason, or an empty string.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Rejections need a reason; reasons are at most 500 characters.
    pub fn validate(&self) -> CoreResult<()> {
        let reason = self.reason();
        if self.decision == ReviewDecision::Rejected && reason.is_empty() {
            return Err(CoreError::validation(
                "reason",
                "is required when rejecting",
            ));
        }
        validate::length("reason", reason, 0, 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_needs_reason() {
        let review = NewReview {
            decision: ReviewDecision::Rejected,
            reason: Some("  ".into()),
        };
        assert!(review.validate().is_err());

        let review = NewReview {
            decision: ReviewDecision::Rejected,
            reason: Some(" broken link ".into()),
        };
        assert!(review.validate().is_ok());
        assert_eq!(review.reason(), "broken link");
    }

    #[test]
    fn approval_reason_is_optional() {
        let review = NewReview {
            decision: ReviewDecision::Approved,
            reason: None,
        };
        assert!(review.validate().is_ok());
        assert_eq!(review.reason(), "");
    }
}
