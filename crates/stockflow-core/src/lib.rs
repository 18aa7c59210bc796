//! # stockflow-core: Pure Domain Logic for Stockflow
//!
//! This crate holds the inventory domain as plain data and pure functions:
//! the entities the ledger stores, the error taxonomy every layer speaks,
//! request validation, and the movement planner that turns a shipment line
//! into signed stock deltas.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockflow Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              API layer (excluded, any transport)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockflow-engine                             │   │
//! │  │    TransactionOrchestrator, StockBalanceManager, queries        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockflow-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ movement  │  │   error   │  │ validation│  │   │
//! │  │   │ Shipment  │  │ Movement  │  │ CoreError │  │   rules   │  │   │
//! │  │   │ Balance   │  │  planner  │  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockflow-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Warehouse, StockBalance, Shipment, ...)
//! - [`movement`] - Signed stock movements derived from shipment lines
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockflow_core::{ItemRequest, ShipmentKind, Route};
//!
//! let route = Route::Transfer { from: 1, to: 2 };
//! let line = ItemRequest::new(7, 4);
//! let movements = route.movements(&line);
//!
//! assert_eq!(route.kind(), ShipmentKind::Transfer);
//! assert_eq!(movements.len(), 2);
//! assert_eq!(movements.iter().map(|m| m.delta).sum::<i64>(), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod movement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use movement::{Movement, Route};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page a single list call may return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Upper bound for a single line item count.
///
/// Keeps every per-item delta and every running balance far away from
/// `i64` overflow even after many movements.
pub const MAX_ITEM_COUNT: i64 = i32::MAX as i64;

/// Maximum line items accepted in one shipment.
pub const MAX_SHIPMENT_ITEMS: usize = 500;
