//! # Warehouse Repository
//!
//! Database operations for warehouses.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{search_key, search_query};
use stockflow_core::{Id, NewWarehouse, Page, PageRequest, Warehouse};

const WAREHOUSE_COLUMNS: &str = "id, name, location, created_at, updated_at";

/// Repository for warehouse database operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    /// Creates a new WarehouseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Inserts a new warehouse.
    pub async fn create(&self, warehouse: &NewWarehouse) -> DbResult<Warehouse> {
        debug!(name = %warehouse.name, "Inserting warehouse");

        let created = sqlx::query_as::<_, Warehouse>(&format!(
            "INSERT INTO warehouses (name, location, created_at, updated_at, name_key) \
             VALUES (?1, ?2, ?3, ?3, ?4) \
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(Utc::now())
        .bind(search_key(&warehouse.name))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Gets a warehouse by ID.
    pub async fn get_by_id(&self, id: Id) -> DbResult<Option<Warehouse>> {
        debug!(id = id, "Getting warehouse by ID");

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(warehouse)
    }

    /// Replaces the editable fields of a warehouse.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if the warehouse doesn't exist
    pub async fn update(&self, id: Id, warehouse: &NewWarehouse) -> DbResult<Warehouse> {
        debug!(id = id, "Updating warehouse");

        let updated = sqlx::query_as::<_, Warehouse>(&format!(
            "UPDATE warehouses SET name = ?2, location = ?3, updated_at = ?4, name_key = ?5 \
             WHERE id = ?1 \
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(id)
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(Utc::now())
        .bind(search_key(&warehouse.name))
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Warehouse", id))
    }

    /// Searches warehouses by a case-insensitive name fragment.
    pub async fn search(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> DbResult<Page<Warehouse>> {
        let query = search_query(query);

        debug!(query = ?query, page = page.page, size = page.size, "Searching warehouses");

        let items = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses \
             WHERE (?1 IS NULL OR instr(name_key, ?1) > 0) \
             ORDER BY id {} \
             LIMIT ?2 OFFSET ?3",
            page.order.sql()
        ))
        .bind(&query)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM warehouses WHERE (?1 IS NULL OR instr(name_key, ?1) > 0)",
        )
        .bind(&query)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(items, page, total as u64))
    }

    /// Counts all warehouses.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warehouses")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn depot(name: &str) -> NewWarehouse {
        NewWarehouse {
            name: name.to_string(),
            location: "Dock 4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_update_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        let created = repo.create(&depot("North")).await.unwrap();
        let renamed = repo.update(created.id, &depot("North annex")).await.unwrap();

        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "North annex");
        assert_eq!(repo.get_by_id(created.id).await.unwrap(), Some(renamed));
    }

    #[tokio::test]
    async fn test_search_and_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        repo.create(&depot("North")).await.unwrap();
        repo.create(&depot("South")).await.unwrap();

        let page = repo.search(Some("nor"), PageRequest::first()).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "North");
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_folds_unicode_case() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.warehouses();

        repo.create(&depot("Склад Север")).await.unwrap();
        repo.create(&depot("South")).await.unwrap();

        let page = repo.search(Some("СЕВЕР"), PageRequest::first()).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Склад Север");

        let none = repo.search(Some("_"), PageRequest::first()).await.unwrap();
        assert_eq!(none.total_items, 0);
    }
}
