//! # Engine Error Types
//!
//! Error types for engine operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Domain      │  │    Database     │  │      Operational        │ │
//! │  │   (CoreError)   │  │    (DbError)    │  │                         │ │
//! │  │                 │  │                 │  │  Timeout                │ │
//! │  │  NotFound       │  │  Busy ─────────────► lifted to Conflict      │ │
//! │  │  InvalidArgument│  │  PoolExhausted ────► lifted to Conflict      │ │
//! │  │  Insufficient   │  │  QueryFailed    │  │  Config                 │ │
//! │  │  Conflict       │  │  ...            │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  EngineError::kind() flattens everything into an ErrorKind for the     │
//! │  API layer.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use stockflow_core::CoreError;
use stockflow_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type covering every failure a caller can observe.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain rule rejected the request.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unexpected storage failure.
    #[error("Storage error: {0}")]
    Database(DbError),

    /// The unit of work did not finish in time and was rolled back.
    #[error("Transaction '{operation}' timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Flat classification of [`EngineError`] for callers that map errors to
/// a protocol (status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InsufficientStock,
    Conflict,
    Timeout,
    Storage,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

/// Lock contention becomes a domain `Conflict`, a missing row a domain
/// `NotFound`. Everything else stays a storage failure.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Busy(msg) => EngineError::Domain(CoreError::Conflict(msg)),
            DbError::PoolExhausted => EngineError::Domain(CoreError::Conflict(
                "no database connection available".to_string(),
            )),
            DbError::NotFound { entity, id } => {
                EngineError::Domain(CoreError::NotFound { entity, id })
            }
            other => EngineError::Database(other),
        }
    }
}

impl From<stockflow_core::ValidationError> for EngineError {
    fn from(err: stockflow_core::ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl EngineError {
    /// Flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(core) => match core {
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::InvalidArgument(_) | CoreError::Validation(_) => {
                    ErrorKind::InvalidArgument
                }
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::Conflict(_) => ErrorKind::Conflict,
            },
            EngineError::Database(_) => ErrorKind::Storage,
            EngineError::Timeout { .. } => ErrorKind::Timeout,
            EngineError::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if the whole unit of work may be retried.
    ///
    /// Only lock contention qualifies. Domain rejections are final, and a
    /// timeout already spent the caller's time budget.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            EngineError::Domain(core) => Some(core),
            _ => None,
        }
    }
}
