//! # Shipment Repository
//!
//! The append-only shipment journal: headers plus their line items.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  shipments                          shipment_items                      │
//! │  ─────────────────────────          ─────────────────────────────       │
//! │  id, kind, date                1──N id, shipment_id                     │
//! │  warehouse_id                       product_id                          │
//! │  destination_warehouse_id           count > 0                           │
//! │  user_id, created_at                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Headers and items are only ever inserted inside a unit of work, so a
//! reader sees a shipment with all of its items or not at all.

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use stockflow_core::{Id, Page, PageRequest, Route, Shipment, ShipmentFilter, ShipmentItem};

const SHIPMENT_COLUMNS: &str =
    "id, kind, date, warehouse_id, destination_warehouse_id, user_id, created_at";

const ITEM_COLUMNS: &str = "id, shipment_id, product_id, count";

const FILTER: &str = "WHERE (?1 IS NULL OR kind = ?1) \
                      AND (?2 IS NULL OR warehouse_id = ?2) \
                      AND (?3 IS NULL OR date >= ?3) \
                      AND (?4 IS NULL OR date <= ?4)";

/// Repository for shipments and their items.
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    /// Creates a new ShipmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    // =========================================================================
    // Writes (inside a unit of work)
    // =========================================================================

    /// Inserts a shipment header for the route and returns it without items.
    ///
    /// Being a write, this is the statement that takes the database write
    /// lock when it opens a unit of work.
    pub async fn insert_header(
        conn: &mut SqliteConnection,
        route: &Route,
        date: NaiveDate,
        user_id: Option<Id>,
    ) -> DbResult<Shipment> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "INSERT INTO shipments \
             (kind, date, warehouse_id, destination_warehouse_id, user_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(route.kind())
        .bind(date)
        .bind(route.primary_warehouse())
        .bind(route.destination_warehouse())
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!(id = shipment.id, kind = %shipment.kind, "Inserted shipment header");
        Ok(shipment)
    }

    /// Appends one line item to a shipment.
    pub async fn insert_item(
        conn: &mut SqliteConnection,
        shipment_id: Id,
        product_id: Id,
        count: i64,
    ) -> DbResult<ShipmentItem> {
        let item = sqlx::query_as::<_, ShipmentItem>(&format!(
            "INSERT INTO shipment_items (shipment_id, product_id, count) \
             VALUES (?1, ?2, ?3) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(shipment_id)
        .bind(product_id)
        .bind(count)
        .fetch_one(conn)
        .await?;

        Ok(item)
    }

    // =========================================================================
    // Reads (committed state)
    // =========================================================================

    /// Gets a shipment with its items in insertion order.
    pub async fn get_by_id(&self, id: Id) -> DbResult<Option<Shipment>> {
        debug!(id = id, "Getting shipment by ID");

        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut shipment) = shipment else {
            return Ok(None);
        };

        shipment.items = sqlx::query_as::<_, ShipmentItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM shipment_items WHERE shipment_id = ?1 ORDER BY id ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(shipment))
    }

    /// Gets a single line item by its own id.
    pub async fn get_item(&self, id: Id) -> DbResult<Option<ShipmentItem>> {
        debug!(id = id, "Getting shipment item by ID");

        let item = sqlx::query_as::<_, ShipmentItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM shipment_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists shipments matching the filter, items included.
    ///
    /// The warehouse filter matches the header warehouse (the target of an
    /// incoming shipment, the source of a write-off or transfer). Date
    /// bounds are inclusive.
    pub async fn list(
        &self,
        filter: &ShipmentFilter,
        page: PageRequest,
    ) -> DbResult<Page<Shipment>> {
        debug!(filter = ?filter, page = page.page, size = page.size, "Listing shipments");

        let mut shipments = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments {FILTER} \
             ORDER BY id {} LIMIT ?5 OFFSET ?6",
            page.order.sql()
        ))
        .bind(filter.kind)
        .bind(filter.warehouse_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM shipments {FILTER}"))
            .bind(filter.kind)
            .bind(filter.warehouse_id)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.pool)
            .await?;

        self.attach_items(&mut shipments).await?;

        Ok(Page::new(shipments, page, total as u64))
    }

    /// Loads the items of a page of shipments in one query.
    async fn attach_items(&self, shipments: &mut [Shipment]) -> DbResult<()> {
        if shipments.is_empty() {
            return Ok(());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS} FROM shipment_items WHERE shipment_id IN ("
        ));
        {
            let mut ids = query.separated(", ");
            for shipment in shipments.iter() {
                ids.push_bind(shipment.id);
            }
            ids.push_unseparated(") ORDER BY id ASC");
        }

        let items = query
            .build_query_as::<ShipmentItem>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_shipment: HashMap<Id, Vec<ShipmentItem>> = HashMap::new();
        for item in items {
            by_shipment.entry(item.shipment_id).or_default().push(item);
        }
        for shipment in shipments.iter_mut() {
            shipment.items = by_shipment.remove(&shipment.id).unwrap_or_default();
        }

        Ok(())
    }

    /// Signed sum of every committed movement of a product in a warehouse.
    pub async fn ledger_total(&self, product_id: Id, warehouse_id: Id) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::ledger_total_in(&mut conn, product_id, warehouse_id).await
    }

    /// [`ledger_total`](Self::ledger_total) on a given connection, so it can
    /// share a snapshot with balance reads.
    ///
    /// Incoming adds at the header warehouse, write-off and transfer
    /// subtract there, and a transfer adds at its destination.
    pub async fn ledger_total_in(
        conn: &mut SqliteConnection,
        product_id: Id,
        warehouse_id: Id,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM( \
                 CASE WHEN s.warehouse_id = ?2 \
                      THEN (CASE s.kind WHEN 'incoming' THEN i.count ELSE -i.count END) \
                      ELSE 0 END \
               + CASE WHEN s.kind = 'transfer' AND s.destination_warehouse_id = ?2 \
                      THEN i.count ELSE 0 END \
             ), 0) \
             FROM shipment_items i JOIN shipments s ON s.id = i.shipment_id \
             WHERE i.product_id = ?1",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// Counts all shipments.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
