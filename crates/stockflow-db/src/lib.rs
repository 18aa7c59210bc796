//! # stockflow-db: Database Layer for Stockflow
//!
//! This crate provides database access for the Stockflow inventory engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockflow Data Flow                              │
//! │                                                                         │
//! │  TransactionOrchestrator (stockflow-engine)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockflow-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ShipmentRepo  │    │ 001_initial  │  │   │
//! │  │   │ UnitOfWork    │    │ ProductRepo   │    │  _schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - Transaction wrapper for multi-statement writes
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockflow_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stock.db")).await?;
//!
//! // Committed reads go through the pool
//! let shipment = db.shipments().get_by_id(7).await?;
//!
//! // Writes share one transaction
//! let mut uow = db.begin("incoming").await?;
//! let balance = StockRepository::get_or_create(uow.conn(), product, warehouse).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::shipment::ShipmentRepository;
pub use repository::stock::StockRepository;
pub use repository::user::UserRepository;
pub use repository::warehouse::WarehouseRepository;
