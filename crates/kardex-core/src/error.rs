//! # Error Types
//!
//! Domain-specific error types for kardex-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kardex-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kardex-db errors (separate crate)                                     │
//! │  ├── DbError          - Storage failures (incl. CAS conflicts)         │
//! │  └── InventoryError   - What engine callers see                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                           DbError ──┴→ InventoryError → caller         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::{ProductId, WarehouseId};

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock in the partition to post an outflow.
    ///
    /// ## When This Occurs
    /// - A sale line asks for more than the warehouse holds
    /// - A transfer line asks for more than the *source* warehouse holds
    /// - A manual "out" adjustment would drive the balance below zero
    ///
    /// ## Caller Workflow
    /// ```text
    /// Complete order #7 (2 × Lomo Saltado, 1 × Chicha)
    ///      │
    ///      ▼
    /// register_sale → line 2: available=0, required=1
    ///      │
    ///      ▼
    /// InsufficientStock { product: 31, warehouse: 4, available: 0, required: 1 }
    ///      │
    ///      ▼
    /// Whole batch rolled back, UI shows "Only 0 in stock"
    /// ```
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: \
         available {available}, required {required}"
    )]
    InsufficientStock {
        product_id: ProductId,
        warehouse_id: WarehouseId,
        available: Quantity,
        required: Quantity,
    },

    /// The balance a posting would leave can't be represented.
    ///
    /// Lines are bounded by validation, so this only trips on a partition that
    /// has already accumulated an absurd position.
    #[error("Balance of product {product_id} in warehouse {warehouse_id} would overflow")]
    BalanceOverflow {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    /// Origin columns of a stored movement do not describe a valid origin.
    #[error("Invalid movement origin: kind {kind} with document id {origin_id:?}")]
    InvalidOrigin {
        kind: String,
        origin_id: Option<i64>,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before the engine touches storage.
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

    /// Value exceeds what a ledger column can hold.
    #[error("{field} must not exceed {max}")]
    TooLarge { field: String, max: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. an unparseable quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Combination of values is not allowed.
    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: ProductId::new(10),
            warehouse_id: WarehouseId::new(4),
            available: Quantity::from_units(30),
            required: Quantity::from_units(40),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 10 in warehouse 4: available 30, required 40"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "items[0].quantity".to_string(),
        };
        assert_eq!(err.to_string(), "items[0].quantity must be positive");

        let err = ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        };
        assert_eq!(err.to_string(), "reason must be at most 500 characters");

        let err = ValidationError::TooLarge {
            field: "items[2].unit_cost".to_string(),
            max: "$99999999.99".to_string(),
        };
        assert_eq!(err.to_string(), "items[2].unit_cost must not exceed $99999999.99");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
