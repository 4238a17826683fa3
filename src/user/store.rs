//! Local user persistence boundary.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Result, ServerError};
use crate::user::User;

/// Port for the host-owned user records this bridge reads and writes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether a record exists for `email`.
    async fn exists(&self, email: &str) -> Result<bool>;

    /// Find a record by its natural key.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new record.
    /// Fails with [`ServerError::AlreadyExists`] when `email` is taken.
    async fn create(&self, user: &User) -> Result<User>;

    /// Write back an existing record. Only the bridge-managed fields
    /// (`username`, `first_name`) are updated.
    async fn save(&self, user: &User) -> Result<()>;
}

/// PostgreSQL implementation of [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)"#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT email, username, first_name, role, locale, created_at
                FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: &User) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, username, first_name, role, locale, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING email, username, first_name, role, locale, created_at"#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.role)
        .bind(&user.locale)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(into_create_error)?;

        Ok(created)
    }

    async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"UPDATE users SET username = $2, first_name = $3 WHERE email = $1"#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Unique violation on the natural key becomes a typed conflict so the
/// provisioner can fall back to an update.
fn into_create_error(err: sqlx::Error) -> ServerError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ServerError::AlreadyExists
        },
        _ => ServerError::Sql(err),
    }
}
