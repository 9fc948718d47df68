//! Field validation helpers shared by the input types.

use crate::error::{CoreError, CoreResult};

/// Checks that `value` has between `min` and `max` characters.
pub(crate) fn length(field: &'static str, value: &str, min: usize, max: usize) -> CoreResult<()> {
    let len = value.chars().count();
    if len < min {
        let message = if min == 1 {
            "must not be empty".to_string()
        } else {
            format!("must be at least {min} characters")
        };
        return Err(CoreError::validation(field, message));
    }
    if len > max {
        return Err(CoreError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// 3 to 32 ASCII letters, digits or underscores.
pub(crate) fn username(value: &str) -> CoreResult<()> {
    length("username", value, 3, 32)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::validation(
            "username",
            "may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

/// Something shaped like `local@domain`.
pub(crate) fn email(value: &str) -> CoreResult<()> {
    length("email", value, 3, 254)?;
    match value.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(CoreError::validation("email", "is not an email address")),
    }
}

/// An absolute http(s) URL of at most 1024 characters.
pub(crate) fn url(field: &'static str, value: &str) -> CoreResult<()> {
    length(field, value, 1, 1024)?;
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !value.contains(char::is_whitespace) => Ok(()),
        _ => Err(CoreError::validation(field, "must be an http or https URL")),
    }
}
