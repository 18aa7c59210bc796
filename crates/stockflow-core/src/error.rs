//! # Error Types
//!
//! Domain-specific error types for stockflow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockflow-core errors (this file)                                     │
//! │  ├── CoreError        - Domain taxonomy the API layer maps             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockflow-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockflow-engine errors                                               │
//! │  └── EngineError      - What callers of the engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors.
///
/// Every failure of an inventory operation that is not a storage fault is
/// one of these variants.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    ///
    /// ## When This Occurs
    /// - Warehouse id passed to a shipment operation is unknown
    /// - Initiating user of an incoming shipment is unknown
    /// - Shipment or stock row requested by id is absent
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: String, id: String },

    /// The request itself is malformed.
    ///
    /// ## When This Occurs
    /// - Line item references a product that does not exist
    /// - Transfer source and destination are the same warehouse
    /// - Date range is inverted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A decrease would drive a balance below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Write-off (qty: 15)
    ///      │
    ///      ▼
    /// Lock balance: available=10
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 3, warehouse_id: 1, available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// Whole shipment rolled back
    /// ```
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: i64,
        warehouse_id: i64,
        available: i64,
        requested: i64,
    },

    /// Concurrent writers kept the balance locked past every retry.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InvalidArgument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidArgument(message.into())
    }

    /// True for errors caused by the caller's input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidArgument(_) | CoreError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any unit of work is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
