//! Test fixtures and database helpers.
//!
//! Provides temporary databases, fast password hashing and a seeded campus
//! for service and HTTP tests.

use campushare_core::models::{Course, NewCourse, NewResource, NewUser, Resource, User};
use campushare_core::{
    Actor, Database, DatabaseConfig, HashCost, PasswordHasher, ResourceKind, Role, Services,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Password given to every fixture user.
pub const TEST_PASSWORD: &str = "password123";

/// A migrated test database with automatic cleanup.
pub struct TestDatabase {
    /// The database handle.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Opens a fresh in-memory database.
    pub async fn memory() -> Self {
        Self {
            db: Database::in_memory()
                .await
                .expect("Failed to open in-memory database"),
            _temp_dir: None,
        }
    }

    /// Opens a fresh database file in a temporary directory.
    pub async fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let url = format!("sqlite://{}", temp_dir.path().join("campushare.db").display());
        let db = Database::open(&DatabaseConfig::new(url))
            .await
            .expect("Failed to open file database");

        Self {
            db,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database file path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|d| d.path().join("campushare.db"))
    }

    /// Services over this database, with fast password hashing.
    pub fn services(&self) -> Services {
        Services::new(self.db.clone(), fast_hasher())
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// A password hasher with minimum cost.
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::new(HashCost::Fast)
}

/// Registration input for `username` with [`TEST_PASSWORD`].
pub fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.edu"),
        password: TEST_PASSWORD.to_string(),
        nickname: None,
    }
}

/// Course input with the given code.
pub fn new_course(code: &str) -> NewCourse {
    NewCourse {
        code: code.to_string(),
        name: format!("Course {code}"),
        description: String::new(),
        teacher_name: "Prof. Example".to_string(),
        department: "Computer Science".to_string(),
        credits: 3.0,
        semester: "2024-fall".to_string(),
    }
}

/// Resource input for `course_id`.
pub fn new_resource(course_id: i64, title: &str) -> NewResource {
    NewResource {
        course_id,
        title: title.to_string(),
        description: format!("{title} for testing"),
        kind: ResourceKind::Notes,
        url: format!("https://files.example.edu/{}.pdf", title.replace(' ', "-")),
        file_size: 4096,
    }
}

/// Returns the actor for a user.
pub fn actor(user: &User) -> Actor {
    Actor::new(user.id, user.role)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// One user per role, a second student and a course created by the teacher.
    pub struct Campus {
        /// The backing database.
        pub test_db: TestDatabase,
        /// Services over it.
        pub services: Services,
        /// A student.
        pub student: User,
        /// Another student.
        pub other_student: User,
        /// A teacher.
        pub teacher: User,
        /// An administrator.
        pub admin: User,
        /// A course created by `teacher`.
        pub course: Course,
    }

    impl Campus {
        /// The student as actor.
        pub fn student(&self) -> Actor {
            actor(&self.student)
        }

        /// The other student as actor.
        pub fn other_student(&self) -> Actor {
            actor(&self.other_student)
        }

        /// The teacher as actor.
        pub fn teacher(&self) -> Actor {
            actor(&self.teacher)
        }

        /// The administrator as actor.
        pub fn admin(&self) -> Actor {
            actor(&self.admin)
        }

        /// Shares a resource as the teacher, so it is approved at once.
        pub async fn approved_resource(&self, title: &str) -> Resource {
            self.services
                .resources
                .create(&self.teacher(), new_resource(self.course.id, title))
                .await
                .expect("Failed to create approved resource")
        }

        /// Shares a resource as the student, so it waits for review.
        pub async fn pending_resource(&self, title: &str) -> Resource {
            self.services
                .resources
                .create(&self.student(), new_resource(self.course.id, title))
                .await
                .expect("Failed to create pending resource")
        }
    }

    /// Seeds a campus in a fresh in-memory database.
    pub async fn campus() -> Campus {
        campus_in(TestDatabase::memory().await).await
    }

    /// Seeds a campus in the given database.
    pub async fn campus_in(test_db: TestDatabase) -> Campus {
        let services = test_db.services();
        let users = &services.users;

        let admin = users
            .create_admin(new_user("admin"))
            .await
            .expect("Failed to create admin");
        let student = users
            .register(new_user("student"))
            .await
            .expect("Failed to register student");
        let other_student = users
            .register(new_user("other_student"))
            .await
            .expect("Failed to register student");
        let teacher = users
            .register(new_user("teacher"))
            .await
            .expect("Failed to register teacher");
        let teacher = users
            .set_role(&actor(&admin), teacher.id, Role::Teacher)
            .await
            .expect("Failed to promote teacher");

        let course = services
            .courses
            .create(&actor(&teacher), new_course("CS101"))
            .await
            .expect("Failed to create course");

        Campus {
            test_db,
            services,
            student,
            other_student,
            teacher,
            admin,
            course,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_database_is_migrated() {
        let test_db = TestDatabase::memory().await;
        assert!(test_db.path().is_none());
        assert!(test_db.schema_version().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn file_database_has_a_path() {
        let test_db = TestDatabase::file().await;
        let path = test_db.path().unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn campus_scenario() {
        let campus = scenarios::campus().await;
        assert_eq!(campus.student.role, Role::Student);
        assert_eq!(campus.teacher.role, Role::Teacher);
        assert_eq!(campus.admin.role, Role::Admin);
        assert_eq!(campus.course.created_by, Some(campus.teacher.id));

        let approved = campus.approved_resource("lecture 1").await;
        assert!(approved.is_approved());
        let pending = campus.pending_resource("my notes").await;
        assert!(!pending.is_approved());
    }
}
