use super::{keyword, push_keyword};
use crate::auth::PasswordHasher;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{NewUser, UpdateProfile, User, UserFilter};
use crate::pagination::{Page, PageRequest};
use crate::permission::{Actor, Permission};
use crate::types::{now_millis, Role, UserId, UserStatus};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, warn};

const USER_COLUMNS: &str =
    "id, username, email, nickname, avatar_url, bio, role, status, created_at, updated_at";

/// Accounts, credentials and account administration.
#[derive(Debug, Clone)]
pub struct UserService {
    db: Database,
    hasher: PasswordHasher,
}

impl UserService {
    /// Creates the service.
    pub fn new(db: Database, hasher: PasswordHasher) -> Self {
        Self { db, hasher }
    }

    /// Registers a student account.
    pub async fn register(&self, input: NewUser) -> CoreResult<User> {
        self.insert(input, Role::Student).await
    }

    /// Creates an administrator account. Used to bootstrap a deployment.
    pub async fn create_admin(&self, input: NewUser) -> CoreResult<User> {
        self.insert(input, Role::Admin).await
    }

    async fn insert(&self, input: NewUser, role: Role) -> CoreResult<User> {
        let input = input.normalized();
        input.validate()?;
        if self.taken("username", &input.username, None).await? {
            return Err(CoreError::already_exists("user", "username"));
        }
        if self.taken("email", &input.email, None).await? {
            return Err(CoreError::already_exists("user", "email"));
        }

        let hash = self.hasher.hash_blocking(input.password.clone()).await?;
        let now = now_millis();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, nickname, role, status, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&hash)
        .bind(input.display_name())
        .bind(role)
        .bind(UserStatus::Active)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(CoreError::from);

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            // Lost a race with a concurrent registration.
            Err(err) if err.is_unique_violation() => {
                return Err(CoreError::already_exists("user", "username"))
            }
            Err(err) => return Err(err),
        };
        info!(user_id = id, username = %input.username, %role, "user created");
        self.get(id).await
    }

    /// Returns true if another user already uses `value` in `column`.
    async fn taken(
        &self,
        column: &'static str,
        value: &str,
        except: Option<UserId>,
    ) -> CoreResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {column} = ? AND id != ?)");
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .bind(except.unwrap_or(0))
            .fetch_one(self.db.pool())
            .await?;
        Ok(taken)
    }

    /// Checks a username or email and password.
    ///
    /// Wrong passwords and unknown accounts both give `InvalidCredentials`.
    /// Banned accounts give `AccountBanned`, but only with the right password.
    pub async fn authenticate(&self, account: &str, password: &str) -> CoreResult<User> {
        let account = account.trim();
        let row: Option<(UserId, String, UserStatus)> = sqlx::query_as(
            "SELECT id, password_hash, status FROM users WHERE username = ? OR email = ?",
        )
        .bind(account)
        .bind(account)
        .fetch_optional(self.db.pool())
        .await?;

        let Some((id, hash, status)) = row else {
            debug!(account, "login for unknown account");
            return Err(CoreError::InvalidCredentials);
        };
        if !self.hasher.verify_blocking(password.to_string(), hash).await? {
            warn!(user_id = id, "login with wrong password");
            return Err(CoreError::InvalidCredentials);
        }
        if status == UserStatus::Banned {
            return Err(CoreError::AccountBanned);
        }
        self.get(id).await
    }

    /// Loads a user.
    pub async fn get(&self, id: UserId) -> CoreResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    /// Loads a user, failing with `AccountBanned` for banned accounts.
    pub async fn get_active(&self, id: UserId) -> CoreResult<User> {
        let user = self.get(id).await?;
        if !user.is_active() {
            return Err(CoreError::AccountBanned);
        }
        Ok(user)
    }

    /// Lists users. Requires `ManageUsers`.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: &UserFilter,
        page: PageRequest,
    ) -> CoreResult<Page<User>> {
        actor.require(Permission::ManageUsers)?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.db.pool())
            .await?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = query
            .build_query_as::<User>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(Page::new(users, total, page))
    }

    /// Changes profile fields of `id`.
    pub async fn update_profile(&self, id: UserId, update: UpdateProfile) -> CoreResult<User> {
        update.validate()?;
        let mut user = self.get(id).await?;
        if update.is_empty() {
            return Ok(user);
        }

        if let Some(email) = update.email {
            let email = email.trim().to_string();
            if self.taken("email", &email, Some(id)).await? {
                return Err(CoreError::already_exists("user", "email"));
            }
            user.email = email;
        }
        if let Some(nickname) = update.nickname {
            user.nickname = nickname.trim().to_string();
        }
        if let Some(url) = update.avatar_url {
            let url = url.trim();
            user.avatar_url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Some(bio) = update.bio {
            user.bio = bio;
        }

        sqlx::query(
            "UPDATE users SET email = ?, nickname = ?, avatar_url = ?, bio = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(now_millis())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        debug!(user_id = id, "profile updated");
        self.get(id).await
    }

    /// Replaces the password after checking the old one.
    pub async fn change_password(
        &self,
        id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> CoreResult<()> {
        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))?;
        if !self
            .hasher
            .verify_blocking(old_password.to_string(), hash)
            .await?
        {
            return Err(CoreError::InvalidCredentials);
        }

        let hash = self.hasher.hash_blocking(new_password.to_string()).await?;
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(now_millis())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        info!(user_id = id, "password changed");
        Ok(())
    }

    /// Changes another user's role. Requires `ManageUsers`.
    pub async fn set_role(&self, actor: &Actor, id: UserId, role: Role) -> CoreResult<User> {
        actor.require(Permission::ManageUsers)?;
        if actor.is_owner(id) {
            return Err(CoreError::conflict("cannot change your own role"));
        }
        self.set_column(id, "role", role.as_str()).await?;
        info!(actor = actor.user_id, user_id = id, %role, "role changed");
        self.get(id).await
    }

    /// Bans or reinstates a user. Requires `ManageUsers`.
    pub async fn set_status(
        &self,
        actor: &Actor,
        id: UserId,
        status: UserStatus,
    ) -> CoreResult<User> {
        actor.require(Permission::ManageUsers)?;
        if actor.is_owner(id) && status == UserStatus::Banned {
            return Err(CoreError::conflict("cannot ban yourself"));
        }
        self.set_column(id, "status", status.as_str()).await?;
        info!(actor = actor.user_id, user_id = id, %status, "status changed");
        self.get(id).await
    }

    async fn set_column(&self, id: UserId, column: &'static str, value: &str) -> CoreResult<()> {
        let sql = format!("UPDATE users SET {column} = ?, updated_at = ? WHERE id = ?");
        let done = sqlx::query(&sql)
            .bind(value)
            .bind(now_millis())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if done.rows_affected() == 0 {
            return Err(CoreError::not_found("user", id));
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    if let Some(keyword) = keyword(&filter.keyword) {
        push_keyword(qb, &["username", "nickname", "email"], keyword);
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}
