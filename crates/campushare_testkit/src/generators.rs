//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random inputs that pass (or, for the
//! `invalid_*` strategies, deliberately fail) input validation.

use campushare_core::models::{NewCourse, NewUser, MAX_SCORE, MIN_SCORE};
use campushare_core::{ResourceKind, Role};
use proptest::prelude::*;

/// Strategy for generating valid usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{2,31}").expect("Invalid regex")
}

/// Strategy for generating usernames that fail validation.
pub fn invalid_username_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z]{0,2}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{33,40}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{2,8}[ !@#.-][a-z]{1,8}").expect("Invalid regex"),
    ]
}

/// Strategy for generating valid registrations.
pub fn new_user_strategy() -> impl Strategy<Value = NewUser> {
    (
        username_strategy(),
        prop::string::string_regex("[a-z]{1,10}\\.edu").expect("Invalid regex"),
        prop::string::string_regex("[!-~]{8,40}").expect("Invalid regex"),
    )
        .prop_map(|(username, domain, password)| NewUser {
            email: format!("{username}@{domain}"),
            username,
            password,
            nickname: None,
        })
}

/// Strategy for generating valid rating scores.
pub fn score_strategy() -> impl Strategy<Value = i64> {
    MIN_SCORE..=MAX_SCORE
}

/// Strategy for generating non-empty lists of valid scores.
pub fn scores_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(score_strategy(), 1..=max_len.max(1))
}

/// Strategy for generating roles.
pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

/// Strategy for generating resource kinds.
pub fn resource_kind_strategy() -> impl Strategy<Value = ResourceKind> {
    prop::sample::select(ResourceKind::ALL.to_vec())
}

/// Strategy for generating valid course codes.
pub fn course_code_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{2,4}[0-9]{3}").expect("Invalid regex")
}

/// Strategy for generating valid course inputs.
pub fn new_course_strategy() -> impl Strategy<Value = NewCourse> {
    (
        course_code_strategy(),
        prop::string::string_regex("[A-Za-z][A-Za-z ]{0,60}").expect("Invalid regex"),
        0u32..=40,
    )
        .prop_map(|(code, name, half_credits)| NewCourse {
            code,
            name,
            credits: f64::from(half_credits) / 2.0,
            ..Default::default()
        })
}

/// Strategy for generating search keywords, including LIKE wildcards.
pub fn keyword_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z%_\\\\]{1,12}").expect("Invalid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_users_validate(user in new_user_strategy()) {
            let user = user.normalized();
            prop_assert!(user.validate().is_ok());
        }

        #[test]
        fn invalid_usernames_fail(name in invalid_username_strategy()) {
            let mut user = NewUser {
                username: name,
                email: "x@example.edu".into(),
                password: "password123".into(),
                nickname: None,
            };
            user = user.normalized();
            prop_assert!(user.validate().is_err());
        }

        #[test]
        fn generated_courses_validate(course in new_course_strategy()) {
            let course = course.normalized();
            prop_assert!(course.validate().is_ok());
        }

        #[test]
        fn scores_in_range(scores in scores_strategy(20)) {
            prop_assert!(!scores.is_empty());
            prop_assert!(scores.iter().all(|s| (MIN_SCORE..=MAX_SCORE).contains(s)));
        }
    }
}
