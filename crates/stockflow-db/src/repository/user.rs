//! # User Repository
//!
//! Identity records for people who receive goods. Usernames are unique.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockflow_core::{Id, User};

const USER_COLUMNS: &str = "id, username, email, created_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` if the username is taken
    pub async fn create(&self, username: &str, email: Option<&str>) -> DbResult<User> {
        debug!(username = %username, "Inserting user");

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: username.to_string(),
            },
            other => other,
        })?;

        Ok(created)
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: Id) -> DbResult<Option<User>> {
        debug!(id = id, "Getting user by ID");

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
