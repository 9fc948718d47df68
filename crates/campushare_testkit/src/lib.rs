//! # CampuShare Testkit
//!
//! Test utilities for CampuShare.
//!
//! This crate provides:
//! - Temporary databases (in-memory or in a temp directory)
//! - A seeded campus with one user per role and a course
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use campushare_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn student_can_rate() {
//!     let campus = scenarios::campus().await;
//!     let target = RatingTarget::Course(campus.course.id);
//!     campus.services.ratings.rate(&campus.student(), target, 5).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
