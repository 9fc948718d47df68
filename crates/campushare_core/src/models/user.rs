use super::validate;
use crate::auth::MAX_PASSWORD_LENGTH;
use crate::error::CoreResult;
use crate::types::{Role, Timestamp, UserId, UserStatus};
use serde::{Deserialize, Serialize};

/// A user account, as seen by the account owner and administrators.
///
/// The password hash is never loaded into this type.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub nickname: String,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Free-form self description.
    pub bio: String,
    /// Current role.
    pub role: Role,
    /// Current status.
    pub status: UserStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl User {
    /// Returns true if the account may log in.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// What anyone may see about a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicProfile {
    /// User id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display name.
    pub nickname: String,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Self description.
    pub bio: String,
    /// Role.
    pub role: Role,
    /// Creation time.
    pub created_at: Timestamp,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            avatar_url: user.avatar_url,
            bio: user.bio,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plain text password. Hashed before it is stored.
    pub password: String,
    /// Display name; defaults to the username.
    #[serde(default)]
    pub nickname: Option<String>,
}

impl NewUser {
    /// Trims the text fields.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.nickname = self
            .nickname
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }

    /// Validates every field except the password, which the hasher checks.
    pub fn validate(&self) -> CoreResult<()> {
        validate::username(&self.username)?;
        validate::email(&self.email)?;
        if let Some(nickname) = &self.nickname {
            validate::length("nickname", nickname, 0, 64)?;
        }
        validate::length("password", &self.password, 0, MAX_PASSWORD_LENGTH)
    }

    /// The nickname to store.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// Profile changes. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    /// New display name.
    #[serde(default)]
    pub nickname: Option<String>,
    /// New email address.
    #[serde(default)]
    pub email: Option<String>,
    /// New avatar URL; an empty string clears it.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// New self description.
    #[serde(default)]
    pub bio: Option<String>,
}

impl UpdateProfile {
    /// Validates the present fields.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(nickname) = &self.nickname {
            validate::length("nickname", nickname.trim(), 1, 64)?;
        }
        if let Some(email) = &self.email {
            validate::email(email.trim())?;
        }
        if let Some(url) = self.avatar_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                validate::url("avatar_url", url)?;
            }
        }
        if let Some(bio) = &self.bio {
            validate::length("bio", bio, 0, 500)?;
        }
        Ok(())
    }

    /// Returns true if nothing would change.
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.email.is_none()
            && self.avatar_url.is_none()
            && self.bio.is_none()
    }
}

/// Filter for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Substring of username, nickname or email.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Only this role.
    #[serde(default)]
    pub role: Option<Role>,
    /// Only this status.
    #[serde(default)]
    pub status: Option<UserStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn input() -> NewUser {
        NewUser {
            username: "  ada_l ".into(),
            email: " ada@example.edu".into(),
            password: "long enough".into(),
            nickname: Some("   ".into()),
        }
    }

    #[test]
    fn normalize_trims_and_drops_blank_nickname() {
        let user = input().normalized();
        assert_eq!(user.username, "ada_l");
        assert_eq!(user.email, "ada@example.edu");
        assert_eq!(user.nickname, None);
        assert_eq!(user.display_name(), "ada_l");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn invalid_username_is_reported() {
        let mut user = input().normalized();
        user.username = "no spaces please".into();
        assert!(matches!(
            user.validate(),
            Err(CoreError::Validation {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn profile_update_validation() {
        let update = UpdateProfile {
            avatar_url: Some(String::new()),
            bio: Some("x".repeat(500)),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.is_empty());

        let update = UpdateProfile {
            avatar_url: Some("javascript:alert(1)".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateProfile {
            nickname: Some("  ".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateProfile::default().is_empty());
    }

    #[test]
    fn public_profile_hides_email() {
        let user = User {
            id: 1,
            username: "ada".into(),
            email: "ada@example.edu".into(),
            nickname: "Ada".into(),
            avatar_url: None,
            bio: String::new(),
            role: Role::Student,
            status: UserStatus::Active,
            created_at: 1,
            updated_at: 1,
        };
        let json = serde_json::to_value(PublicProfile::from(user)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["role"], "student");
    }
}
