//! # stockflow-engine: Inventory Transaction Engine
//!
//! This crate owns the transaction boundaries of Stockflow. Every shipment
//! (incoming, write-off, transfer) is executed as a single unit of work: the
//! header, its items and all balance changes commit together or not at all.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Inventory (facade)                             │
//! │                                                                         │
//! │  ┌────────────────────┐   ┌────────────────────┐   ┌────────────────┐  │
//! │  │ Transaction        │   │ ShipmentQuery      │   │ Catalog        │  │
//! │  │ Orchestrator       │   │ StockQuery         │   │                │  │
//! │  │                    │   │                    │   │ products       │  │
//! │  │ validate → resolve │   │ get / list         │   │ warehouses     │  │
//! │  │ → unit of work     │   │ reconcile / audit  │   │ users          │  │
//! │  │ → retry on Conflict│   │                    │   │                │  │
//! │  └─────────┬──────────┘   └─────────┬──────────┘   └───────┬────────┘  │
//! │            │                        │                      │            │
//! │  ┌─────────▼──────────┐             │                      │            │
//! │  │ StockBalanceManager│             │                      │            │
//! │  │ guarded decrements │             │                      │            │
//! │  └─────────┬──────────┘             │                      │            │
//! │            └────────────────────────┼──────────────────────┘            │
//! │                                     ▼                                   │
//! │                   stockflow-db (SQLite, WAL, repositories)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`orchestrator`] - `TransactionOrchestrator`, one unit of work per shipment
//! - [`balance`] - `StockBalanceManager`, non-negative balance updates
//! - [`query`] - Shipment and stock read surfaces, ledger reconciliation
//! - [`catalog`] - Products, warehouses and users
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Engine error type and the caller-facing `ErrorKind`
//! - [`telemetry`] - `tracing` subscriber setup
//!
//! ## Example
//! ```rust,no_run
//! use stockflow_engine::{Inventory, StockflowConfig};
//! use stockflow_core::ItemRequest;
//!
//! # async fn run() -> stockflow_engine::EngineResult<()> {
//! let inventory = Inventory::open(StockflowConfig::load(None)?).await?;
//!
//! let shipment = inventory
//!     .transactions()
//!     .create_incoming(1, &[ItemRequest::new(7, 10)], 1)
//!     .await?;
//! println!("shipment #{} with {} units", shipment.id, shipment.total_units());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod query;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use balance::StockBalanceManager;
pub use catalog::Catalog;
pub use config::{DatabaseSettings, QuerySettings, StockflowConfig, TransactionSettings};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use orchestrator::TransactionOrchestrator;
pub use query::{ShipmentQuery, StockQuery};
pub use telemetry::init_tracing;

use stockflow_db::Database;
use tracing::info;

// =============================================================================
// Facade
// =============================================================================

/// One handle onto an open inventory database.
///
/// Every component shares the same connection pool. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Inventory {
    db: Database,
    config: StockflowConfig,
    transactions: TransactionOrchestrator,
    shipments: ShipmentQuery,
    stock: StockQuery,
    catalog: Catalog,
}

impl Inventory {
    /// Opens (and migrates) the configured database.
    pub async fn open(config: StockflowConfig) -> EngineResult<Self> {
        config.validate()?;

        let db = Database::new(config.database.db_config()).await?;
        info!(path = ?config.database.path, "Inventory opened");

        Ok(Self::with_database(db, config))
    }

    /// Wraps an already open database.
    pub fn with_database(db: Database, config: StockflowConfig) -> Self {
        Inventory {
            transactions: TransactionOrchestrator::new(db.clone(), config.transactions.clone()),
            shipments: ShipmentQuery::new(db.clone(), config.query.clone()),
            stock: StockQuery::new(db.clone(), config.query.clone()),
            catalog: Catalog::new(db.clone(), config.query.max_page_size),
            db,
            config,
        }
    }

    pub fn transactions(&self) -> &TransactionOrchestrator {
        &self.transactions
    }

    pub fn shipments(&self) -> &ShipmentQuery {
        &self.shipments
    }

    pub fn stock(&self) -> &StockQuery {
        &self.stock
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &StockflowConfig {
        &self.config
    }

    /// Closes the pool; in-flight units of work finish first.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
