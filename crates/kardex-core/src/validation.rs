//! # Validation Module
//!
//! Input validation for engine calls. Runs before any transaction is opened.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (order / purchase / transfer workflows)               │
//! │  └── Document state checks (order completed, PO received, ...)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: InventoryEngine                                              │
//! │  └── THIS MODULE: quantities, costs, warehouses, reasons               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger computation                                           │
//! │  └── Sufficiency (InsufficientStock) against the latest balance        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                       │
//! │  ├── CHECK (quantity_balance >= 0)                                     │
//! │  ├── CHECK origin columns                                              │
//! │  └── UNIQUE (partition, previous_movement_id)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::validation::{validate_quantity, validate_reason};
//! use kardex_core::Quantity;
//!
//! validate_quantity("quantity", Quantity::from_units(5)).unwrap();
//! assert!(validate_quantity("quantity", Quantity::zero()).is_err());
//! assert!(validate_reason("   ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Adjustment, Direction, PurchaseLine, SaleLine, TransferLine, WarehouseId};
use crate::{MAX_BATCH_LINES, MAX_DETAIL_LEN, MAX_HISTORY_LIMIT, MAX_LINE_QUANTITY, MAX_UNIT_COST};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a movement quantity.
///
/// ## Rules
/// - Must be positive (> 0). A zero-quantity movement would add a row that
///   changes nothing.
/// - At most `MAX_LINE_QUANTITY`
pub fn validate_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_LINE_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Validates the quantity asked for in a stock check.
///
/// ## Rules
/// - Must not be negative. Zero is allowed.
pub fn validate_required_quantity(quantity: Quantity) -> ValidationResult<()> {
    if quantity.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "required".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit cost.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (donations, free samples)
/// - At most `MAX_UNIT_COST`
///
/// ## Example
/// ```rust
/// use kardex_core::validation::validate_unit_cost;
/// use kardex_core::Money;
///
/// assert!(validate_unit_cost("unit_cost", Money::from_cents(200)).is_ok());
/// assert!(validate_unit_cost("unit_cost", Money::zero()).is_ok());
/// assert!(validate_unit_cost("unit_cost", Money::from_cents(-1)).is_err());
/// assert!(validate_unit_cost("unit_cost", Money::from_cents(10_000_000_000)).is_err());
/// ```
pub fn validate_unit_cost(field: &str, cost: Money) -> ValidationResult<()> {
    if cost.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cost > MAX_UNIT_COST {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_UNIT_COST.to_string(),
        });
    }

    Ok(())
}

/// Validates a manual adjustment reason.
///
/// ## Rules
/// - Must not be blank
/// - At most `MAX_DETAIL_LEN` characters (it becomes the movement detail)
///
/// ## Returns
/// The trimmed reason.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_DETAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_DETAIL_LEN,
        });
    }

    Ok(reason.to_string())
}

/// Validates that a transfer moves stock between two different warehouses.
pub fn validate_distinct_warehouses(from: WarehouseId, to: WarehouseId) -> ValidationResult<()> {
    if from == to {
        return Err(ValidationError::Invalid {
            field: "to_warehouse_id".to_string(),
            reason: format!("must differ from the source warehouse ({})", from),
        });
    }

    Ok(())
}

/// Validates a history page size.
///
/// ## Rules
/// - Between 1 and `MAX_HISTORY_LIMIT`
pub fn validate_history_limit(limit: u32) -> ValidationResult<()> {
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_HISTORY_LIMIT as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in one engine call.
///
/// ## Rules
/// - Must not exceed `MAX_BATCH_LINES`. An empty batch is valid (no-op).
pub fn validate_batch_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_BATCH_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_BATCH_LINES as i64,
        });
    }

    Ok(())
}

fn item_field(index: usize, name: &str) -> String {
    format!("items[{}].{}", index, name)
}

/// Validates the lines of a completed order.
///
/// ## Example
/// ```rust
/// use kardex_core::validation::validate_sale_lines;
/// use kardex_core::{ProductId, Quantity, SaleLine, ValidationError};
///
/// let lines = [
///     SaleLine::new(ProductId::new(10), Quantity::from_units(2)),
///     SaleLine::new(ProductId::new(11), Quantity::zero()),
/// ];
/// match validate_sale_lines(&lines) {
///     Err(ValidationError::MustBePositive { field }) => assert_eq!(field, "items[1].quantity"),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
pub fn validate_sale_lines(lines: &[SaleLine]) -> ValidationResult<()> {
    validate_batch_size(lines.len())?;
    for (i, line) in lines.iter().enumerate() {
        validate_quantity(&item_field(i, "quantity"), line.quantity)?;
    }
    Ok(())
}

/// Validates the lines of a received purchase order.
pub fn validate_purchase_lines(lines: &[PurchaseLine]) -> ValidationResult<()> {
    validate_batch_size(lines.len())?;
    for (i, line) in lines.iter().enumerate() {
        validate_quantity(&item_field(i, "quantity"), line.quantity)?;
        validate_unit_cost(&item_field(i, "unit_cost"), line.unit_cost)?;
    }
    Ok(())
}

/// Validates a received transfer.
pub fn validate_transfer_lines(from: WarehouseId, to: WarehouseId, lines: &[TransferLine]) -> ValidationResult<()> {
    validate_batch_size(lines.len())?;
    if lines.is_empty() {
        return Ok(());
    }

    validate_distinct_warehouses(from, to)?;
    for (i, line) in lines.iter().enumerate() {
        validate_quantity(&item_field(i, "quantity"), line.quantity)?;
    }
    Ok(())
}

/// Validates a manual adjustment.
///
/// ## Returns
/// The trimmed reason, ready to be stored as the movement detail.
pub fn validate_adjustment(adjustment: &Adjustment) -> ValidationResult<String> {
    validate_quantity("quantity", adjustment.quantity)?;

    if let Some(cost) = adjustment.unit_cost {
        if adjustment.direction == Direction::In {
            validate_unit_cost("unit_cost", cost)?;
        }
    }

    validate_reason(&adjustment.reason)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    fn units(n: i64) -> Quantity {
        Quantity::from_units(n)
    }

    fn adjustment(direction: Direction, reason: &str) -> Adjustment {
        Adjustment {
            product_id: ProductId::new(10),
            warehouse_id: WarehouseId::new(4),
            direction,
            quantity: units(3),
            unit_cost: None,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", units(1)).is_ok());
        assert!(validate_quantity("quantity", Quantity::from_scaled(1)).is_ok());

        assert!(validate_quantity("quantity", Quantity::zero()).is_err());
        assert!(validate_quantity("quantity", units(-1)).is_err());

        assert!(validate_quantity("quantity", MAX_LINE_QUANTITY).is_ok());
        match validate_quantity("items[0].quantity", Quantity::from_scaled(MAX_LINE_QUANTITY.scaled() + 1)) {
            Err(ValidationError::TooLarge { field, max }) => {
                assert_eq!(field, "items[0].quantity");
                assert_eq!(max, "999999.9999");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_unit_cost_bounds() {
        assert!(validate_unit_cost("unit_cost", MAX_UNIT_COST).is_ok());
        assert!(matches!(
            validate_unit_cost("unit_cost", Money::from_cents(MAX_UNIT_COST.cents() + 1)),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_largest_line_value_fits_in_cents() {
        let value = MAX_UNIT_COST.times_quantity(MAX_LINE_QUANTITY);
        assert!(value.is_some_and(|v| v.is_positive()));
    }

    #[test]
    fn test_validate_required_quantity() {
        assert!(validate_required_quantity(Quantity::zero()).is_ok());
        assert!(validate_required_quantity(units(40)).is_ok());
        assert!(validate_required_quantity(Quantity::from_scaled(-1)).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(validate_reason("  broken bottle ").unwrap(), "broken bottle");
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(MAX_DETAIL_LEN)).is_ok());
        assert!(validate_reason(&"x".repeat(MAX_DETAIL_LEN + 1)).is_err());
        // counted in characters, not bytes
        assert!(validate_reason(&"ñ".repeat(MAX_DETAIL_LEN)).is_ok());
    }

    #[test]
    fn test_validate_distinct_warehouses() {
        assert!(validate_distinct_warehouses(WarehouseId::new(4), WarehouseId::new(5)).is_ok());
        assert!(validate_distinct_warehouses(WarehouseId::new(4), WarehouseId::new(4)).is_err());
    }

    #[test]
    fn test_validate_history_limit() {
        assert!(validate_history_limit(1).is_ok());
        assert!(validate_history_limit(MAX_HISTORY_LIMIT).is_ok());
        assert!(validate_history_limit(0).is_err());
        assert!(validate_history_limit(MAX_HISTORY_LIMIT + 1).is_err());
    }

    #[test]
    fn test_validate_purchase_lines_reports_field() {
        let lines = [
            PurchaseLine::new(ProductId::new(10), units(50), Money::from_cents(200)),
            PurchaseLine::new(ProductId::new(11), units(5), Money::from_cents(-1)),
        ];
        match validate_purchase_lines(&lines) {
            Err(ValidationError::MustNotBeNegative { field }) => assert_eq!(field, "items[1].unit_cost"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_batches_are_valid() {
        assert!(validate_sale_lines(&[]).is_ok());
        assert!(validate_purchase_lines(&[]).is_ok());
        // even a same-warehouse transfer is a no-op when it has no lines
        assert!(validate_transfer_lines(WarehouseId::new(4), WarehouseId::new(4), &[]).is_ok());
    }

    #[test]
    fn test_validate_transfer_lines() {
        let lines = [TransferLine::new(ProductId::new(10), units(30))];
        assert!(validate_transfer_lines(WarehouseId::new(4), WarehouseId::new(5), &lines).is_ok());
        assert!(validate_transfer_lines(WarehouseId::new(4), WarehouseId::new(4), &lines).is_err());
    }

    #[test]
    fn test_validate_batch_size() {
        assert!(validate_batch_size(MAX_BATCH_LINES).is_ok());
        assert!(validate_batch_size(MAX_BATCH_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_adjustment() {
        assert_eq!(
            validate_adjustment(&adjustment(Direction::Out, " waste ")).unwrap(),
            "waste"
        );
        assert!(validate_adjustment(&adjustment(Direction::In, "")).is_err());

        let mut negative_cost = adjustment(Direction::In, "count");
        negative_cost.unit_cost = Some(Money::from_cents(-5));
        assert!(validate_adjustment(&negative_cost).is_err());

        // cost is ignored for outbound adjustments
        negative_cost.direction = Direction::Out;
        assert!(validate_adjustment(&negative_cost).is_ok());
    }
}
