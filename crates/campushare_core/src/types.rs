//! Core type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// User identifier.
pub type UserId = i64;
/// Course identifier.
pub type CourseId = i64;
/// Resource identifier.
pub type ResourceId = i64;
/// Comment identifier.
pub type CommentId = i64;
/// Review record identifier.
pub type ReviewId = i64;
/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

/// Returns the current time as Unix milliseconds.
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {}: {other:?}",
                        stringify!($name).to_ascii_lowercase()
                    )),
                }
            }
        }
    };
}

text_enum! {
    /// Account role. Determines the permission set (see [`crate::Permission`]).
    pub enum Role {
        /// Regular student account.
        Student => "student",
        /// Teaching staff; may manage courses and review resources.
        Teacher => "teacher",
        /// Administrator; may do everything.
        Admin => "admin",
    }
}

text_enum! {
    /// Account status.
    pub enum UserStatus {
        /// Account may log in.
        Active => "active",
        /// Account is locked out.
        Banned => "banned",
    }
}

text_enum! {
    /// What a shared resource contains.
    pub enum ResourceKind {
        /// Lecture or study notes.
        Notes => "notes",
        /// Slide decks.
        Slides => "slides",
        /// Past exams.
        Exam => "exam",
        /// Assignments and their solutions.
        Assignment => "assignment",
        /// Recorded lectures.
        Video => "video",
        /// Anything else.
        Other => "other",
    }
}

text_enum! {
    /// Moderation state of a resource.
    pub enum ResourceStatus {
        /// Awaiting review; only visible to the uploader and reviewers.
        Pending => "pending",
        /// Publicly visible.
        Approved => "approved",
        /// Refused by a reviewer.
        Rejected => "rejected",
    }
}

text_enum! {
    /// Outcome of a moderation review.
    pub enum ReviewDecision {
        /// The resource is published.
        Approved => "approved",
        /// The resource is refused.
        Rejected => "rejected",
    }
}

text_enum! {
    /// Kind of entity a rating is attached to.
    pub enum TargetKind {
        /// A course.
        Course => "course",
        /// A resource.
        Resource => "resource",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::Other
    }
}

impl ReviewDecision {
    /// Resource status a decision moves the resource to.
    pub fn resulting_status(self) -> ResourceStatus {
        match self {
            ReviewDecision::Approved => ResourceStatus::Approved,
            ReviewDecision::Rejected => ResourceStatus::Rejected,
        }
    }
}

/// Something a user can rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingTarget {
    /// A course.
    Course(CourseId),
    /// A resource.
    Resource(ResourceId),
}

impl RatingTarget {
    /// Returns the kind of the target.
    pub fn kind(&self) -> TargetKind {
        match self {
            RatingTarget::Course(_) => TargetKind::Course,
            RatingTarget::Resource(_) => TargetKind::Resource,
        }
    }

    /// Returns the id of the target.
    pub fn id(&self) -> i64 {
        match self {
            RatingTarget::Course(id) | RatingTarget::Resource(id) => *id,
        }
    }

    /// Table holding the target rows.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RatingTarget::Course(_) => "courses",
            RatingTarget::Resource(_) => "resources",
        }
    }
}

impl fmt::Display for RatingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_text_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert_eq!(" Teacher ".parse::<Role>().unwrap(), Role::Teacher);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ResourceKind::Assignment).unwrap();
        assert_eq!(json, "\"assignment\"");
        let status: ResourceStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, ResourceStatus::Approved);
    }

    #[test]
    fn review_decision_status() {
        assert_eq!(
            ReviewDecision::Approved.resulting_status(),
            ResourceStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Rejected.resulting_status(),
            ResourceStatus::Rejected
        );
    }

    #[test]
    fn rating_target_accessors() {
        let target = RatingTarget::Resource(7);
        assert_eq!(target.kind(), TargetKind::Resource);
        assert_eq!(target.id(), 7);
        assert_eq!(target.table(), "resources");
        assert_eq!(target.to_string(), "resource 7");
        assert_eq!(RatingTarget::Course(1).table(), "courses");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
