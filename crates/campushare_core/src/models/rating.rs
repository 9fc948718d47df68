use crate::error::{CoreError, CoreResult};
use crate::types::{TargetKind, Timestamp, UserId};
use serde::Serialize;

/// Lowest allowed score.
pub const MIN_SCORE: i64 = 1;
/// Highest allowed score.
pub const MAX_SCORE: i64 = 5;

/// One user's score for a course or resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Rating {
    /// Rating id.
    pub id: i64,
    /// Who rated.
    pub user_id: UserId,
    /// What kind of thing was rated.
    pub target_kind: TargetKind,
    /// Id of the rated course or resource.
    pub target_id: i64,
    /// Score in `MIN_SCORE..=MAX_SCORE`.
    pub score: i64,
    /// First rated.
    pub created_at: Timestamp,
    /// Last changed.
    pub updated_at: Timestamp,
}

/// Aggregate stored on the rated row after each change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Mean score rounded to two decimals, 0 when unrated.
    pub average: f64,
    /// Number of ratings.
    pub count: i64,
}

impl RatingSummary {
    /// Builds a summary from the score total and count.
    pub fn from_totals(total: i64, count: i64) -> Self {
        Self {
            average: rounded_average(total, count),
            count,
        }
    }
}

/// Checks a score is within range.
pub fn validate_score(score: i64) -> CoreResult<()> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(CoreError::validation(
            "score",
            format!("must be between {MIN_SCORE} and {MAX_SCORE}"),
        ))
    }
}

/// Mean of `count` scores summing to `total`, rounded to two decimals.
pub fn rounded_average(total: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    let mean = total as f64 / count as f64;
    (mean * 100.0).round() / 100.0
}
