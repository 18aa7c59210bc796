//! # Domain Types
//!
//! Core domain types used throughout Stockflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Warehouse     │   │  StockBalance   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  product_id ┐   │       │
//! │  │  name, unit     │   │  name           │   │  warehouse_id┘  │       │
//! │  │  description    │   │  location       │   │  count >= 0     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Shipment     │1─N│  ShipmentItem   │   │  ShipmentKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  kind, date     │   │  shipment_id    │   │  Incoming       │       │
//! │  │  warehouse_id   │   │  product_id     │   │  WriteOff       │       │
//! │  │  items          │   │  count > 0      │   │  Transfer       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership by Id
//! Entities reference each other through integer ids. A shipment owns its
//! items as a plain `Vec`; there are no back-pointers between objects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, ValidationError};
use crate::DEFAULT_PAGE_SIZE;

/// Row identity for every stored entity.
pub type Id = i64;

// =============================================================================
// Catalog Entities
// =============================================================================

/// A product whose stock is tracked per warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Unit of measure ("pcs", "kg", "box").
    pub unit: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to register or update a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
}

/// A storage location holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: Id,
    pub name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to register or update a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    pub location: String,
}

/// A person who can initiate incoming shipments.
///
/// Authentication lives outside the engine; only identity is kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Balance
// =============================================================================

/// Materialized current stock of one product in one warehouse.
///
/// At most one row exists per `(product_id, warehouse_id)`. Rows are created
/// lazily with `count = 0` and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockBalance {
    pub id: Id,
    pub product_id: Id,
    pub warehouse_id: Id,
    /// Never negative.
    pub count: i64,
    pub last_update: DateTime<Utc>,
}

impl StockBalance {
    /// Whether `amount` can be taken out without going negative.
    #[inline]
    pub fn can_take(&self, amount: i64) -> bool {
        self.count >= amount
    }
}

// =============================================================================
// Shipment Kind
// =============================================================================

/// The kind of a stock transaction.
///
/// Stored and serialized with the canonical strings `incoming`,
/// `write-off` and `transfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentKind {
    /// Goods received into a warehouse.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "incoming"))]
    Incoming,
    /// Goods removed from a warehouse (damage, loss, consumption).
    #[cfg_attr(feature = "sqlx", sqlx(rename = "write-off"))]
    WriteOff,
    /// Goods moved from one warehouse to another.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "transfer"))]
    Transfer,
}

impl ShipmentKind {
    /// All kinds, in declaration order.
    pub const ALL: [ShipmentKind; 3] = [
        ShipmentKind::Incoming,
        ShipmentKind::WriteOff,
        ShipmentKind::Transfer,
    ];

    /// Canonical string used in storage and filters.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShipmentKind::Incoming => "incoming",
            ShipmentKind::WriteOff => "write-off",
            ShipmentKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for ShipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" => Ok(ShipmentKind::Incoming),
            "write-off" | "write_off" | "writeoff" => Ok(ShipmentKind::WriteOff),
            "transfer" => Ok(ShipmentKind::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "transaction kind".to_string(),
                allowed: ShipmentKind::ALL
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Shipment
// =============================================================================

/// A committed stock transaction header with its line items.
///
/// Immutable once created. Corrections are made with a new, offsetting
/// shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: Id,
    pub kind: ShipmentKind,
    /// Calendar day (UTC) the shipment was recorded.
    pub date: NaiveDate,
    /// Primary warehouse: target of incoming, source of write-off/transfer.
    pub warehouse_id: Id,
    /// Receiving warehouse, only set for transfers.
    pub destination_warehouse_id: Option<Id>,
    /// Initiating user, only set for incoming shipments.
    pub user_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    /// Line items in insertion order.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<ShipmentItem>,
}

impl Shipment {
    /// Total units across all line items.
    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|item| item.count).sum()
    }
}

/// A line item exclusively owned by one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShipmentItem {
    pub id: Id,
    pub shipment_id: Id,
    pub product_id: Id,
    /// Always positive.
    pub count: i64,
}

/// A requested line: which product and how many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: Id,
    pub count: i64,
}

impl ItemRequest {
    pub const fn new(product_id: Id, count: i64) -> Self {
        ItemRequest { product_id, count }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Filter for listing shipments. `None` fields match everything.
///
/// Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentFilter {
    pub kind: Option<ShipmentKind>,
    pub warehouse_id: Option<Id>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ShipmentFilter {
    pub fn kind(mut self, kind: ShipmentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn warehouse(mut self, warehouse_id: Id) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }
}

/// Filter for listing stock balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFilter {
    /// Case-insensitive substring of the product name.
    pub product_name: Option<String>,
    pub warehouse_id: Option<Id>,
}

/// Direction of id ordering in list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// SQL keyword for this order.
    pub const fn sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub order: SortOrder,
}

impl PageRequest {
    pub const fn new(page: u32, size: u32) -> Self {
        PageRequest {
            page,
            size,
            order: SortOrder::Descending,
        }
    }

    /// First page with the default size.
    pub const fn first() -> Self {
        PageRequest::new(0, DEFAULT_PAGE_SIZE)
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Row offset of this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Page {
            items,
            page: request.page,
            size: request.size,
            total_items,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_items.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
        }
    }
}

/// Ledger check for one (product, warehouse) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub product_id: Id,
    pub warehouse_id: Id,
    /// Materialized count, 0 when no balance row exists.
    pub balance: i64,
    /// Signed sum of all committed movements for the pair.
    pub ledger_total: i64,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_total && self.balance >= 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_canonical_strings() {
        for kind in ShipmentKind::ALL {
            assert_eq!(kind.as_str().parse::<ShipmentKind>().unwrap(), kind);
        }
        assert_eq!(ShipmentKind::WriteOff.to_string(), "write-off");
    }

    #[test]
    fn test_kind_rejects_outgoing() {
        let err = "outgoing".parse::<ShipmentKind>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_kind_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ShipmentKind::WriteOff).unwrap();
        assert_eq!(json, "\"write-off\"");
    }

    #[test]
    fn test_page_math() {
        let page: Page<i32> = Page::new(vec![1, 2, 3], PageRequest::new(0, 3), 7);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last: Page<i32> = Page::new(vec![7], PageRequest::new(2, 3), 7);
        assert!(!last.has_next());

        let empty: Page<i32> = Page::new(vec![], PageRequest::new(0, 10), 0);
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_page_request_offset() {
        let request = PageRequest::new(3, 20);
        assert_eq!(request.offset(), 60);
        assert_eq!(request.limit(), 20);
        assert_eq!(PageRequest::default().order, SortOrder::Descending);
    }

    #[test]
    fn test_shipment_total_units() {
        let shipment = Shipment {
            id: 1,
            kind: ShipmentKind::Incoming,
            date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            warehouse_id: 1,
            destination_warehouse_id: None,
            user_id: Some(1),
            created_at: Utc::now(),
            items: vec![
                ShipmentItem { id: 1, shipment_id: 1, product_id: 1, count: 4 },
                ShipmentItem { id: 2, shipment_id: 1, product_id: 2, count: 6 },
            ],
        };
        assert_eq!(shipment.total_units(), 10);
    }

    #[test]
    fn test_reconciliation_consistency() {
        let ok = Reconciliation { product_id: 1, warehouse_id: 1, balance: 6, ledger_total: 6 };
        assert!(ok.is_consistent());

        let drift = Reconciliation { product_id: 1, warehouse_id: 1, balance: 6, ledger_total: 10 };
        assert!(!drift.is_consistent());
    }
}
