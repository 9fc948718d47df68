//! Role based permissions.
//!
//! Each [`Role`] maps to a fixed set of [`Permission`]s. Services receive an
//! [`Actor`] (who is acting, with which role) and check it before doing
//! anything with side effects.

use crate::error::{CoreError, CoreResult};
use crate::types::{Role, UserId};
use serde::Serialize;
use std::fmt;

/// Something an actor may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Share a resource.
    UploadResource,
    /// Rate courses and resources.
    RateContent,
    /// Post comments.
    Comment,
    /// Create and edit courses.
    ManageCourses,
    /// Approve or reject resources, and see unpublished ones.
    ReviewResources,
    /// Delete other users' comments.
    ModerateComments,
    /// Delete courses and edit any course.
    DeleteCourses,
    /// Change roles and account status of other users.
    ManageUsers,
}

const STUDENT: &[Permission] = &[
    Permission::UploadResource,
    Permission::RateContent,
    Permission::Comment,
];

const TEACHER: &[Permission] = &[
    Permission::UploadResource,
    Permission::RateContent,
    Permission::Comment,
    Permission::ManageCourses,
    Permission::ReviewResources,
];

impl Permission {
    /// Every permission.
    pub const ALL: &'static [Permission] = &[
        Permission::UploadResource,
        Permission::RateContent,
        Permission::Comment,
        Permission::ManageCourses,
        Permission::ReviewResources,
        Permission::ModerateComments,
        Permission::DeleteCourses,
        Permission::ManageUsers,
    ];

    /// Returns the name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UploadResource => "upload_resource",
            Permission::RateContent => "rate_content",
            Permission::Comment => "comment",
            Permission::ManageCourses => "manage_courses",
            Permission::ReviewResources => "review_resources",
            Permission::ModerateComments => "moderate_comments",
            Permission::DeleteCourses => "delete_courses",
            Permission::ManageUsers => "manage_users",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Permissions granted to this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Student => STUDENT,
            Role::Teacher => TEACHER,
            Role::Admin => Permission::ALL,
        }
    }

    /// Returns true if the role grants `permission`.
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    /// The user's current role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the actor holds `permission`.
    pub fn can(&self, permission: Permission) -> bool {
        self.role.has(permission)
    }

    /// Fails with `PermissionDenied` unless the actor holds `permission`.
    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::permission_denied(permission.as_str()))
        }
    }

    /// Returns true if the actor is `owner_id`.
    pub fn is_owner(&self, owner_id: UserId) -> bool {
        self.user_id == owner_id
    }

    /// Passes if the actor owns the object or holds `permission`.
    pub fn require_owner_or(&self, owner_id: UserId, permission: Permission) -> CoreResult<()> {
        if self.is_owner(owner_id) || self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::permission_denied(permission.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_permissions() {
        let role = Role::Student;
        assert!(role.has(Permission::UploadResource));
        assert!(role.has(Permission::RateContent));
        assert!(role.has(Permission::Comment));
        assert!(!role.has(Permission::ManageCourses));
        assert!(!role.has(Permission::ReviewResources));
        assert!(!role.has(Permission::ManageUsers));
    }

    #[test]
    fn teacher_extends_student() {
        for permission in Role::Student.permissions() {
            assert!(Role::Teacher.has(*permission));
        }
        assert!(Role::Teacher.has(Permission::ManageCourses));
        assert!(Role::Teacher.has(Permission::ReviewResources));
        assert!(!Role::Teacher.has(Permission::DeleteCourses));
        assert!(!Role::Teacher.has(Permission::ModerateComments));
    }

    #[test]
    fn admin_has_everything() {
        for permission in Permission::ALL {
            assert!(Role::Admin.has(*permission), "{permission}");
        }
    }

    #[test]
    fn require_reports_the_permission() {
        let actor = Actor::new(1, Role::Student);
        assert!(actor.require(Permission::Comment).is_ok());
        match actor.require(Permission::ManageUsers) {
            Err(CoreError::PermissionDenied { action }) => assert_eq!(action, "manage_users"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn owner_or_permission() {
        let student = Actor::new(5, Role::Student);
        assert!(student
            .require_owner_or(5, Permission::ModerateComments)
            .is_ok());
        assert!(student
            .require_owner_or(6, Permission::ModerateComments)
            .is_err());

        let admin = Actor::new(1, Role::Admin);
        assert!(admin
            .require_owner_or(6, Permission::ModerateComments)
            .is_ok());
    }
}
