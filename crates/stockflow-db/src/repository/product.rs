//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Case-insensitive name search with paging
//! - Existence checks inside a unit of work

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{search_key, search_query};
use stockflow_core::{Id, NewProduct, Page, PageRequest, Product};

const PRODUCT_COLUMNS: &str = "id, name, unit, description, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Search products
/// let page = repo.search(Some("bolt"), PageRequest::first()).await?;
///
/// // Get by ID
/// let product = repo.get_by_id(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product and returns it with its assigned id.
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();

        debug!(name = %product.name, "Inserting product");

        let created = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, unit, description, created_at, updated_at, name_key) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.unit)
        .bind(&product.description)
        .bind(now)
        .bind(search_key(&product.name))
        .fetch_one(&self.pool)
        .await?;

        debug!(id = created.id, "Product inserted");
        Ok(created)
    }

    /// Gets a product by ID.
    ///
    /// ## Returns
    /// - `Ok(Some(product))` if found
    /// - `Ok(None)` if not found
    pub async fn get_by_id(&self, id: Id) -> DbResult<Option<Product>> {
        debug!(id = id, "Getting product by ID");

        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Checks that a product exists, reading through the unit of work.
    pub async fn exists_in(conn: &mut SqliteConnection, id: Id) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(found.is_some())
    }

    /// Replaces the editable fields of a product.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if the product doesn't exist
    pub async fn update(&self, id: Id, product: &NewProduct) -> DbResult<Product> {
        debug!(id = id, "Updating product");

        let updated = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = ?2, unit = ?3, description = ?4, updated_at = ?5, \
             name_key = ?6 \
             WHERE id = ?1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.unit)
        .bind(&product.description)
        .bind(Utc::now())
        .bind(search_key(&product.name))
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Searches products by a case-insensitive name fragment.
    ///
    /// `None` or a blank query lists every product. Every character of the
    /// query is matched literally. Results are ordered by id in the page's
    /// sort order.
    pub async fn search(&self, query: Option<&str>, page: PageRequest) -> DbResult<Page<Product>> {
        let query = search_query(query);

        debug!(query = ?query, page = page.page, size = page.size, "Searching products");

        let items = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
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
            "SELECT COUNT(*) FROM products WHERE (?1 IS NULL OR instr(name_key, ?1) > 0)",
        )
        .bind(&query)
        .fetch_one(&self.pool)
        .await?;

        debug!(count = items.len(), total = total, "Search returned products");
        Ok(Page::new(items, page, total as u64))
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockflow_core::SortOrder;

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            unit: "pcs".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo.create(&new_product("Hex bolt M6")).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert!(repo.get_by_id(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.products().update(99, &new_product("x")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_paged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        for name in ["Hex Bolt M6", "hex bolt M8", "Washer", "BOLT cutter"] {
            repo.create(&new_product(name)).await.unwrap();
        }

        let page = repo.search(Some("bolt"), PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "BOLT cutter");
        assert!(page.has_next());

        let oldest = repo
            .search(Some("bolt"), PageRequest::new(0, 1).order(SortOrder::Ascending))
            .await
            .unwrap();
        assert_eq!(oldest.items[0].name, "Hex Bolt M6");

        let all = repo.search(None, PageRequest::first()).await.unwrap();
        assert_eq!(all.total_items, 4);
        assert_eq!(repo.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_search_folds_unicode_and_matches_literally() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        for name in ["Болт М6", "БОЛТ анкерный", "Discount 10% pack", "Hex_nut", "Hexnut"] {
            repo.create(&new_product(name)).await.unwrap();
        }

        let cyrillic = repo.search(Some("болт"), PageRequest::first()).await.unwrap();
        assert_eq!(cyrillic.total_items, 2);

        let percent = repo.search(Some("%"), PageRequest::first()).await.unwrap();
        assert_eq!(percent.total_items, 1);
        assert_eq!(percent.items[0].name, "Discount 10% pack");

        let underscore = repo.search(Some("x_n"), PageRequest::first()).await.unwrap();
        assert_eq!(underscore.total_items, 1);
        assert_eq!(underscore.items[0].name, "Hex_nut");

        let renamed = repo
            .update(cyrillic.items[0].id, &new_product("Шайба"))
            .await
            .unwrap();
        let found = repo.search(Some("ШАЙ"), PageRequest::first()).await.unwrap();
        assert_eq!(found.items, vec![renamed]);
    }
}
