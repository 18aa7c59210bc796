//! # Stock Ledger Repository
//!
//! Persistence for the materialized `(product, warehouse) → count` ledger.
//!
//! ## Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     stock_balances row lifecycle                        │
//! │                                                                         │
//! │  first movement on the pair                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT (product_id, warehouse_id) DO NOTHING          │
//! │       │   (a concurrent creator loses the race silently)                │
//! │       ▼                                                                 │
//! │  count = 0 ──► increment ──► count = count + n                         │
//! │              ──► decrement ──► count = count - n  WHERE count >= n     │
//! │                                 (0 rows touched = insufficient)        │
//! │                                                                         │
//! │  Rows are never deleted. CHECK (count >= 0) backs the guard.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutating methods take the unit of work's connection. Read methods use
//! the pool and see the last committed state.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::search_query;
use stockflow_core::{Id, Page, PageRequest, StockBalance, StockFilter};

const BALANCE_COLUMNS: &str = "id, product_id, warehouse_id, count, last_update";

/// Repository for stock balances.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // =========================================================================
    // Reads (committed state)
    // =========================================================================

    /// Gets the balance of one pair, if a row exists.
    pub async fn get(&self, product_id: Id, warehouse_id: Id) -> DbResult<Option<StockBalance>> {
        let balance = sqlx::query_as::<_, StockBalance>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances \
             WHERE product_id = ?1 AND warehouse_id = ?2"
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Gets a balance row by its own id.
    pub async fn get_by_id(&self, id: Id) -> DbResult<Option<StockBalance>> {
        debug!(id = id, "Getting stock balance by ID");

        let balance = sqlx::query_as::<_, StockBalance>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Lists balances matching the filter.
    ///
    /// The product-name filter is a case-insensitive, literal substring
    /// match on the product's folded name.
    pub async fn list(
        &self,
        filter: &StockFilter,
        page: PageRequest,
    ) -> DbResult<Page<StockBalance>> {
        let name = search_query(filter.product_name.as_deref());

        debug!(
            product_name = ?name,
            warehouse_id = ?filter.warehouse_id,
            page = page.page,
            "Listing stock balances"
        );

        const WHERE: &str = "WHERE (?1 IS NULL OR instr(p.name_key, ?1) > 0) \
                             AND (?2 IS NULL OR b.warehouse_id = ?2)";

        let items = sqlx::query_as::<_, StockBalance>(&format!(
            "SELECT b.id, b.product_id, b.warehouse_id, b.count, b.last_update \
             FROM stock_balances b JOIN products p ON p.id = b.product_id \
             {WHERE} \
             ORDER BY b.id {} \
             LIMIT ?3 OFFSET ?4",
            page.order.sql()
        ))
        .bind(&name)
        .bind(filter.warehouse_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stock_balances b JOIN products p ON p.id = b.product_id {WHERE}"
        ))
        .bind(&name)
        .bind(filter.warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(items, page, total as u64))
    }

    /// Every balance row, oldest first.
    pub async fn all(&self) -> DbResult<Vec<StockBalance>> {
        let mut conn = self.pool.acquire().await?;
        Self::all_in(&mut conn).await
    }

    /// Every balance row as seen by the given connection.
    pub async fn all_in(conn: &mut SqliteConnection) -> DbResult<Vec<StockBalance>> {
        let balances = sqlx::query_as::<_, StockBalance>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances ORDER BY id ASC"
        ))
        .fetch_all(conn)
        .await?;

        Ok(balances)
    }

    /// Number of rows for a pair. At most one by the UNIQUE constraint.
    pub async fn row_count(&self, product_id: Id, warehouse_id: Id) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_balances WHERE product_id = ?1 AND warehouse_id = ?2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Writes (inside a unit of work)
    // =========================================================================

    /// Returns the pair's balance, creating a zero row when none exists.
    ///
    /// Safe under concurrent creators: the insert is a no-op when another
    /// transaction created the row first.
    pub async fn get_or_create(
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
    ) -> DbResult<StockBalance> {
        let inserted = sqlx::query(
            "INSERT INTO stock_balances (product_id, warehouse_id, count, last_update) \
             VALUES (?1, ?2, 0, ?3) \
             ON CONFLICT (product_id, warehouse_id) DO NOTHING",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() > 0 {
            debug!(product_id, warehouse_id, "Created empty stock balance");
        }

        let balance = sqlx::query_as::<_, StockBalance>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances \
             WHERE product_id = ?1 AND warehouse_id = ?2"
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(balance)
    }

    /// Current count of a pair as seen by the unit of work.
    pub async fn count_in(
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
    ) -> DbResult<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT count FROM stock_balances WHERE product_id = ?1 AND warehouse_id = ?2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(conn)
        .await?;

        Ok(count)
    }

    /// Adds `amount` to an existing row.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if the row was never created
    pub async fn increment(
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
        amount: i64,
    ) -> DbResult<StockBalance> {
        let balance = sqlx::query_as::<_, StockBalance>(&format!(
            "UPDATE stock_balances SET count = count + ?3, last_update = ?4 \
             WHERE product_id = ?1 AND warehouse_id = ?2 \
             RETURNING {BALANCE_COLUMNS}"
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(amount)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?;

        balance.ok_or_else(|| {
            DbError::not_found("StockBalance", format!("{product_id}@{warehouse_id}"))
        })
    }

    /// Subtracts `amount` only if the row holds at least that much.
    ///
    /// Returns `None` when the row is missing or too small; nothing is
    /// written in that case.
    pub async fn decrement_if_available(
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
        amount: i64,
    ) -> DbResult<Option<StockBalance>> {
        let balance = sqlx::query_as::<_, StockBalance>(&format!(
            "UPDATE stock_balances SET count = count - ?3, last_update = ?4 \
             WHERE product_id = ?1 AND warehouse_id = ?2 AND count >= ?3 \
             RETURNING {BALANCE_COLUMNS}"
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(amount)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?;

        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockflow_core::{NewProduct, NewWarehouse};

    async fn setup() -> (Database, Id, Id) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(&NewProduct {
                name: "Cable tie".to_string(),
                unit: "pcs".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let warehouse = db
            .warehouses()
            .create(&NewWarehouse {
                name: "Main".to_string(),
                location: "Bay 1".to_string(),
            })
            .await
            .unwrap();
        (db, product.id, warehouse.id)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (db, p, w) = setup().await;

        let mut uow = db.begin("test").await.unwrap();
        let first = StockRepository::get_or_create(uow.conn(), p, w).await.unwrap();
        let second = StockRepository::get_or_create(uow.conn(), p, w).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.count, 0);
        assert_eq!(db.stock().row_count(p, w).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_decrement_guard() {
        let (db, p, w) = setup().await;

        let mut uow = db.begin("test").await.unwrap();
        StockRepository::get_or_create(uow.conn(), p, w).await.unwrap();
        let after_in = StockRepository::increment(uow.conn(), p, w, 10).await.unwrap();
        assert_eq!(after_in.count, 10);

        let refused = StockRepository::decrement_if_available(uow.conn(), p, w, 11)
            .await
            .unwrap();
        assert!(refused.is_none());
        assert_eq!(StockRepository::count_in(uow.conn(), p, w).await.unwrap(), Some(10));

        let exact = StockRepository::decrement_if_available(uow.conn(), p, w, 10)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exact.count, 0);
        uow.commit().await.unwrap();

        assert_eq!(db.stock().get(p, w).await.unwrap().unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_increment_requires_row() {
        let (db, p, w) = setup().await;

        let mut uow = db.begin("test").await.unwrap();
        let err = StockRepository::increment(uow.conn(), p, w, 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_negative() {
        let (db, p, w) = setup().await;

        let mut uow = db.begin("test").await.unwrap();
        StockRepository::get_or_create(uow.conn(), p, w).await.unwrap();
        let err = sqlx::query(
            "UPDATE stock_balances SET count = -1 WHERE product_id = ?1 AND warehouse_id = ?2",
        )
        .bind(p)
        .bind(w)
        .execute(uow.conn())
        .await
        .map_err(DbError::from)
        .unwrap_err();

        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_product_name() {
        let (db, p, w) = setup().await;

        let mut uow = db.begin("test").await.unwrap();
        StockRepository::get_or_create(uow.conn(), p, w).await.unwrap();
        uow.commit().await.unwrap();

        let stock = db.stock();
        let hit = stock
            .list(
                &StockFilter {
                    product_name: Some("CABLE".to_string()),
                    warehouse_id: Some(w),
                },
                PageRequest::first(),
            )
            .await
            .unwrap();
        assert_eq!(hit.total_items, 1);

        let miss = stock
            .list(
                &StockFilter {
                    product_name: Some("screw".to_string()),
                    warehouse_id: None,
                },
                PageRequest::first(),
            )
            .await
            .unwrap();
        assert!(miss.items.is_empty());
        assert_eq!(stock.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_name_filter_folds_unicode_case() {
        let (db, _, w) = setup().await;
        let bolt = db
            .products()
            .create(&NewProduct {
                name: "Болт М8".to_string(),
                unit: "шт".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let mut uow = db.begin("test").await.unwrap();
        StockRepository::get_or_create(uow.conn(), bolt.id, w).await.unwrap();
        uow.commit().await.unwrap();

        let by_name = |name: &str| StockFilter {
            product_name: Some(name.to_string()),
            warehouse_id: None,
        };
        let stock = db.stock();

        let hit = stock.list(&by_name("болт"), PageRequest::first()).await.unwrap();
        assert_eq!(hit.total_items, 1);
        assert_eq!(hit.items[0].product_id, bolt.id);

        for wildcard in ["%", "_"] {
            let miss = stock.list(&by_name(wildcard), PageRequest::first()).await.unwrap();
            assert_eq!(miss.total_items, 0, "{wildcard} must match literally");
        }
    }
}
