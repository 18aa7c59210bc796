//! # Validation Module
//!
//! Input validation for Stockflow requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer (excluded)                                         │
//! │  └── Deserialization, required fields                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any unit of work opens)                  │
//! │  ├── Item lists, counts, routes                                        │
//! │  └── Names, paging, date ranges                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (count >= 0), CHECK (count > 0)                             │
//! │  ├── UNIQUE (product_id, warehouse_id)                                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::movement::Route;
use crate::types::{ItemRequest, PageRequest};
use crate::{MAX_ITEM_COUNT, MAX_PAGE_SIZE, MAX_SHIPMENT_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display string (product name, warehouse name, ...).
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use stockflow_core::validation::validate_name;
///
/// assert!(validate_name("name", "Central depot").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a username.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, digits, `.`, `-` and `_` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Movement Validators
// =============================================================================

/// Validates a single movement amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_COUNT
pub fn validate_count(count: i64) -> ValidationResult<()> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "count".to_string(),
        });
    }

    if count > MAX_ITEM_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "count".to_string(),
            min: 1,
            max: MAX_ITEM_COUNT,
        });
    }

    Ok(())
}

/// Validates the line items of a shipment.
///
/// ## Rules
/// - At least one item, at most MAX_SHIPMENT_ITEMS
/// - Every count passes [`validate_count`]
/// - Product ids are positive
///
/// Repeated products are allowed; each line is applied on its own.
pub fn validate_items(items: &[ItemRequest]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_SHIPMENT_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SHIPMENT_ITEMS as i64,
        });
    }

    for item in items {
        if item.product_id <= 0 {
            return Err(ValidationError::InvalidFormat {
                field: "product_id".to_string(),
                reason: format!("{} is not a valid id", item.product_id),
            });
        }
        validate_count(item.count)?;
    }

    Ok(())
}

/// Validates a shipment route.
///
/// ## Rules
/// - Warehouse ids are positive
/// - A transfer's source and destination differ
pub fn validate_route(route: &Route) -> CoreResult<()> {
    for warehouse in route.warehouses() {
        if warehouse <= 0 {
            return Err(CoreError::invalid(format!(
                "{} is not a valid warehouse id",
                warehouse
            )));
        }
    }

    if let Route::Transfer { from, to } = route {
        if from == to {
            return Err(CoreError::invalid(format!(
                "transfer source and destination are the same warehouse ({})",
                from
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Query Validators
// =============================================================================

/// Validates a page request against the configured maximum.
pub fn validate_page(page: &PageRequest, max_size: u32) -> ValidationResult<()> {
    let max = max_size.min(MAX_PAGE_SIZE);
    if page.size == 0 || page.size > max {
        return Err(ValidationError::OutOfRange {
            field: "page size".to_string(),
            min: 1,
            max: i64::from(max),
        });
    }

    Ok(())
}

/// Validates an optional inclusive date range.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> CoreResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(CoreError::invalid(format!(
                "date range starts after it ends ({} > {})",
                from, to
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Bolts M6").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("storekeeper_1").is_ok());
        assert!(validate_username("a.b-c").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(validate_count(1).is_ok());
        assert!(validate_count(MAX_ITEM_COUNT).is_ok());

        assert!(validate_count(0).is_err());
        assert!(validate_count(-5).is_err());
        assert!(validate_count(MAX_ITEM_COUNT + 1).is_err());
    }

    #[test]
    fn test_validate_items() {
        assert!(validate_items(&[ItemRequest::new(1, 10)]).is_ok());
        assert!(validate_items(&[ItemRequest::new(1, 10), ItemRequest::new(1, 5)]).is_ok());

        assert!(matches!(
            validate_items(&[]),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_items(&[ItemRequest::new(1, 0)]).is_err());
        assert!(validate_items(&[ItemRequest::new(0, 3)]).is_err());
    }

    #[test]
    fn test_validate_route() {
        assert!(validate_route(&Route::Incoming { warehouse: 1 }).is_ok());
        assert!(validate_route(&Route::Transfer { from: 1, to: 2 }).is_ok());

        let same = validate_route(&Route::Transfer { from: 3, to: 3 }).unwrap_err();
        assert!(same.is_invalid_argument());
        assert!(validate_route(&Route::WriteOff { warehouse: -1 }).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(&PageRequest::new(0, 10), 100).is_ok());
        assert!(validate_page(&PageRequest::new(0, 0), 100).is_err());
        assert!(validate_page(&PageRequest::new(0, 50), 20).is_err());
        assert!(validate_page(&PageRequest::new(0, 500), 1000).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert!(validate_date_range(Some(jan), Some(feb)).is_ok());
        assert!(validate_date_range(Some(jan), Some(jan)).is_ok());
        assert!(validate_date_range(None, Some(jan)).is_ok());
        assert!(validate_date_range(Some(feb), Some(jan)).is_err());
    }
}
