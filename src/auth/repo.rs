use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::{AuthError, DuplicateField};
use crate::auth::repo_types::User;
use crate::db;

/// Persistence for user records. Implementations own uniqueness: two inserts
/// sharing a username or email must never both succeed.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Inserts atomically; a unique collision yields `DuplicateUser`.
    async fn insert(&self, user: User) -> Result<User, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Writes every mutable column: email, password hash and both flags.
    /// Returns false if no row matched; an email collision yields `DuplicateUser`.
    async fn update_credentials(&self, user: &User) -> Result<bool, AuthError>;

    async fn reset_schema(&self) -> Result<(), AuthError>;
}

pub struct SqliteUserRepository {
    db: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn map_write_error(e: sqlx::Error) -> AuthError {
    if let Some(db_err) = e.as_database_error() {
        let msg = db_err.message();
        if db_err.is_unique_violation() || msg.contains("UNIQUE constraint failed") {
            // SQLite names the column rather than the constraint.
            if msg.contains("users.username") {
                return AuthError::DuplicateUser(DuplicateField::Username);
            }
            if msg.contains("users.email") {
                return AuthError::DuplicateUser(DuplicateField::Email);
            }
        }
    }
    AuthError::StorageUnavailable(e)
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: User) -> Result<User, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash,
                               email_confirmed, two_factor_enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.email_confirmed)
        .bind(user.two_factor_enabled)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash,
                   email_confirmed, two_factor_enabled, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash,
                   email_confirmed, two_factor_enabled, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_credentials(&self, user: &User) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3,
                email_confirmed = $4, two_factor_enabled = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.email_confirmed)
        .bind(user.two_factor_enabled)
        .execute(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_schema(&self) -> Result<(), AuthError> {
        db::reset_schema(&self.db).await?;
        Ok(())
    }
}
