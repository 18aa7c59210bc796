//! # Unit of Work
//!
//! One database transaction spanning every write of a stock operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Unit of Work                                    │
//! │                                                                         │
//! │  Database::begin("write-off")                                          │
//! │       │  BEGIN (deferred)                                               │
//! │       ▼                                                                 │
//! │  first statement is a write ──► takes the SQLite write lock            │
//! │       │                         (others wait up to busy_timeout)        │
//! │       ▼                                                                 │
//! │  repositories run on uow.conn()                                        │
//! │       │                                                                 │
//! │       ├── Ok  ──► commit()   → all writes visible at once              │
//! │       └── Err ──► drop / rollback() → nothing visible                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every statement of a unit of work must go through [`UnitOfWork::conn`].
//! Reaching for the pool while a unit of work is open reads outside the
//! transaction, and with a single-connection pool it waits forever.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An open transaction. Dropping it without [`commit`](Self::commit) rolls
/// back every write made through [`conn`](Self::conn).
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    label: &'static str,
    started: Instant,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("label", &self.label)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Begins a transaction on a pooled connection.
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> DbResult<Self> {
        let tx = pool.begin().await.map_err(|e| match DbError::from(e) {
            DbError::Internal(msg) => DbError::TransactionFailed(msg),
            other => other,
        })?;

        debug!(unit = label, "Unit of work started");

        Ok(UnitOfWork {
            tx,
            label,
            started: Instant::now(),
        })
    }

    /// The transaction's connection, for repository calls.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Makes every write visible atomically.
    pub async fn commit(self) -> DbResult<()> {
        let label = self.label;
        let elapsed = self.started.elapsed();

        self.tx.commit().await?;

        debug!(
            unit = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "Unit of work committed"
        );
        Ok(())
    }

    /// Discards every write explicitly.
    pub async fn rollback(self) -> DbResult<()> {
        let label = self.label;

        if let Err(e) = self.tx.rollback().await {
            warn!(unit = label, error = %e, "Rollback failed");
            return Err(DbError::TransactionFailed(e.to_string()));
        }

        debug!(unit = label, "Unit of work rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn count_users(conn: &mut SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(conn)
            .await
            .unwrap()
    }

    async fn insert_user(conn: &mut SqliteConnection, name: &str) {
        sqlx::query("INSERT INTO users (username, created_at) VALUES (?1, ?2)")
            .bind(name)
            .bind(chrono::Utc::now())
            .execute(conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin("test").await.unwrap();
        insert_user(uow.conn(), "alice").await;
        uow.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(count_users(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut uow = db.begin("test").await.unwrap();
            insert_user(uow.conn(), "bob").await;
            assert_eq!(count_users(uow.conn()).await, 1);
        }

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(count_users(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin("test").await.unwrap();
        insert_user(uow.conn(), "carol").await;
        uow.rollback().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(count_users(&mut conn).await, 0);
    }
}
