//! Domain records and the inputs that create or change them.
//!
//! Records (`User`, `Course`, ...) map rows 1:1 and serialize to the JSON the
//! HTTP layer returns. Inputs (`NewUser`, `UpdateCourse`, ...) deserialize from
//! request bodies and carry their own `validate` methods.

mod comment;
mod course;
mod favorite;
mod rating;
mod resource;
mod review;
mod user;
pub(crate) mod validate;

pub use comment::{Comment, NewComment, MAX_COMMENT_LENGTH};
pub use course::{Course, CourseFilter, CourseSort, NewCourse, UpdateCourse};
pub use favorite::FavoritedResource;
pub use rating::{rounded_average, validate_score, Rating, RatingSummary, MAX_SCORE, MIN_SCORE};
pub use resource::{NewResource, Resource, ResourceFilter, ResourceSort, UpdateResource};
pub use review::{NewReview, ReviewRecord};
pub use user::{NewUser, PublicProfile, UpdateProfile, User, UserFilter};
