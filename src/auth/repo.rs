use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserRow};

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts a user; a duplicate username must fail with `UsernameTaken`
    /// even when two inserts race.
    async fn create(&self, new: NewUser<'_>) -> Result<User, CreateUserError>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
}

#[async_trait]
impl UserRepo for PgPool {
    async fn create(&self, new: NewUser<'_>) -> Result<User, CreateUserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(self)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CreateUserError::UsernameTaken
            }
            other => CreateUserError::Other(anyhow::Error::new(other).context("insert user")),
        })?;
        Ok(User::try_from(row)?)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self)
        .await
        .context("find user by username")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }
}
