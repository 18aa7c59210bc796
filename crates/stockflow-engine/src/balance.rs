//! # Stock Balance Manager
//!
//! Applies signed movements to the materialized ledger inside an open unit
//! of work, keeping every balance non-negative.
//!
//! ## Decrease Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrease(P, W, n)                                                      │
//! │       │                                                                 │
//! │       ├── n <= 0 ──────────────────────────────► InvalidArgument        │
//! │       ▼                                                                 │
//! │  get_or_create(P, W)          (row exists from here on)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE ... SET count = count - n WHERE ... AND count >= n             │
//! │       │                                                                 │
//! │       ├── 1 row  ──► new balance                                       │
//! │       └── 0 rows ──► re-read count ──► InsufficientStock{available, n} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unit of work already holds the database write lock when these run,
//! and the guarded UPDATE keeps the check and the write in one statement.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::EngineResult;
use stockflow_core::validation::validate_count;
use stockflow_core::{CoreError, Id, Movement, StockBalance};
use stockflow_db::StockRepository;

/// Stateless balance operations over a unit-of-work connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockBalanceManager;

impl StockBalanceManager {
    pub fn new() -> Self {
        StockBalanceManager
    }

    /// Returns the pair's balance, creating a zero row on first touch.
    pub async fn get_or_create(
        &self,
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
    ) -> EngineResult<StockBalance> {
        Ok(StockRepository::get_or_create(conn, product_id, warehouse_id).await?)
    }

    /// Adds `amount` units to the pair.
    pub async fn increase(
        &self,
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
        amount: i64,
    ) -> EngineResult<StockBalance> {
        validate_count(amount).map_err(CoreError::from)?;

        self.get_or_create(&mut *conn, product_id, warehouse_id)
            .await?;
        let balance = StockRepository::increment(conn, product_id, warehouse_id, amount).await?;

        debug!(
            product_id,
            warehouse_id,
            amount,
            count = balance.count,
            "Stock increased"
        );
        Ok(balance)
    }

    /// Removes `amount` units from the pair.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the pair holds fewer than `amount` units;
    ///   nothing is written in that case
    pub async fn decrease(
        &self,
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
        amount: i64,
    ) -> EngineResult<StockBalance> {
        validate_count(amount).map_err(CoreError::from)?;

        self.get_or_create(&mut *conn, product_id, warehouse_id)
            .await?;

        match StockRepository::decrement_if_available(&mut *conn, product_id, warehouse_id, amount)
            .await?
        {
            Some(balance) => {
                debug!(
                    product_id,
                    warehouse_id,
                    amount,
                    count = balance.count,
                    "Stock decreased"
                );
                Ok(balance)
            }
            None => {
                let available = StockRepository::count_in(conn, product_id, warehouse_id)
                    .await?
                    .unwrap_or(0);

                debug!(
                    product_id,
                    warehouse_id,
                    available,
                    requested = amount,
                    "Insufficient stock"
                );
                Err(CoreError::InsufficientStock {
                    product_id,
                    warehouse_id,
                    available,
                    requested: amount,
                }
                .into())
            }
        }
    }

    /// Applies one signed movement.
    pub async fn apply(
        &self,
        conn: &mut SqliteConnection,
        movement: &Movement,
    ) -> EngineResult<StockBalance> {
        if movement.is_decrease() {
            self.decrease(conn, movement.product_id, movement.warehouse_id, movement.amount())
                .await
        } else {
            self.increase(conn, movement.product_id, movement.warehouse_id, movement.amount())
                .await
        }
    }
}
