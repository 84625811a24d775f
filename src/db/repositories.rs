//! Users repository.

use async_trait::async_trait;

use super::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::UserRow;

const SCHEMA: &str = include_str!("../../migrations/0001_create_users.sql");

/// Persistent user records keyed by a unique, case-sensitive username.
///
/// `insert` must reject an existing username atomically: callers may race between
/// `find_by_username` and `insert`, and the store is what keeps exactly one winner.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRow>>;

    /// Fails with `AppError::DuplicateUser` when the username is taken.
    async fn insert(&self, username: &str, password_hash: &str) -> AppResult<UserRow>;
}

/// PostgreSQL-backed store. Uniqueness comes from the `users_username_key` constraint.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, username: &str, password_hash: &str) -> AppResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| AppError::DuplicateUser(username.to_string()))
    }
}
