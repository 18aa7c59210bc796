//! # Repository Module
//!
//! Database repository implementations for Stockflow.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into a Repository                           │
//! │                                                                         │
//! │  Reads (committed state)             Writes (inside a UnitOfWork)       │
//! │  ───────────────────────             ───────────────────────────        │
//! │  db.shipments().get_by_id(7)         let mut uow = db.begin("incoming") │
//! │  db.stock().list(&filter, page)      ShipmentRepository::insert_header( │
//! │       │                                  uow.conn(), &route, ..)        │
//! │       │  &self.pool                  StockRepository::increment(        │
//! │       │                                  uow.conn(), p, w, n)           │
//! │       ▼                              uow.commit()                       │
//! │  SqlitePool                               │  &mut SqliteConnection      │
//! │                                           ▼                             │
//! │                                      one sqlx::Transaction              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product CRUD and search
//! - [`WarehouseRepository`] - Warehouse CRUD and search
//! - [`UserRepository`] - User identity lookups
//! - [`StockRepository`] - The materialized stock ledger
//! - [`ShipmentRepository`] - The shipment journal
//!
//! [`ProductRepository`]: product::ProductRepository
//! [`WarehouseRepository`]: warehouse::WarehouseRepository
//! [`UserRepository`]: user::UserRepository
//! [`StockRepository`]: stock::StockRepository
//! [`ShipmentRepository`]: shipment::ShipmentRepository

/// Folds a name for substring search.
///
/// Stored next to every searchable name and applied to the query, then
/// compared with `instr()`, so matching ignores case outside ASCII and
/// treats `%` and `_` as plain characters.
pub(crate) fn search_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Folded search query, `None` when absent or blank.
pub(crate) fn search_query(query: Option<&str>) -> Option<String> {
    query.map(search_key).filter(|q| !q.is_empty())
}

pub mod product;
pub mod shipment;
pub mod stock;
pub mod user;
pub mod warehouse;
