//! # Ledger Module
//!
//! Carry-forward balance computation for a single partition.
//!
//! ## How a Movement Is Computed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Carry-Forward Ledger (per partition)                   │
//! │                                                                         │
//! │  latest row (ORDER BY id DESC LIMIT 1)                                 │
//! │       │            none? → Balance::zero()                             │
//! │       ▼                                                                 │
//! │  Balance { quantity, unit_cost, total }                                │
//! │       │                                                                 │
//! │       ├── post_inflow(qty, unit_cost)   → BalanceOverflow if out of    │
//! │       │                                   range                        │
//! │       │                                                                 │
//! │       └── post_outflow(qty)             → InsufficientStock if         │
//! │                                           balance < qty                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Posting { in-side, out-side, new Balance }  → appended as a new row   │
//! │                                                                         │
//! │  Balances are never summed over history; each row carries its own.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Valuation: Weighted Average Cost
//! - Inflows blend their cost into the running average.
//! - Outflows leave at the current average; the average itself doesn't move.
//! - An outflow that empties the partition takes whatever value is left, so
//!   rounding never strands cents on a zero balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Movement, MovementId, Origin, PartitionKey};

// =============================================================================
// Balance
// =============================================================================

/// The running position of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub quantity: Quantity,
    /// Average cost of one unit.
    pub unit_cost: Money,
    /// Value of the whole position.
    pub total: Money,
}

impl Balance {
    /// Balance of a partition with no history.
    #[inline]
    pub const fn zero() -> Self {
        Balance {
            quantity: Quantity::zero(),
            unit_cost: Money::zero(),
            total: Money::zero(),
        }
    }

    /// Balance carried by a committed movement.
    pub fn from_movement(movement: &Movement) -> Self {
        Balance {
            quantity: movement.quantity_balance,
            unit_cost: movement.cost_balance,
            total: movement.total_balance,
        }
    }

    /// Balance carried by the latest movement, or zero when there is none.
    pub fn from_latest(latest: Option<&Movement>) -> Self {
        latest.map(Balance::from_movement).unwrap_or_default()
    }

    #[inline]
    pub fn covers(&self, quantity: Quantity) -> bool {
        self.quantity >= quantity
    }
}

// =============================================================================
// Posting
// =============================================================================

/// Amounts of one movement plus the balance it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Posting {
    pub quantity_in: Quantity,
    pub cost_in: Money,
    pub total_in: Money,

    pub quantity_out: Quantity,
    pub cost_out: Money,
    pub total_out: Money,

    pub balance: Balance,
}

/// Posts an inflow priced at `unit_cost` per unit.
///
/// ## Errors
/// `CoreError::BalanceOverflow` when the line value or the new balance can't
/// be represented.
pub fn post_inflow(prior: &Balance, key: PartitionKey, quantity: Quantity, unit_cost: Money) -> CoreResult<Posting> {
    let total_in = unit_cost.times_quantity(quantity).ok_or_else(|| overflow(key))?;
    post_valued_inflow(prior, key, quantity, unit_cost, total_in)
}

/// Posts an inflow whose total value is already known.
///
/// Used for the receiving leg of a transfer so the destination gains exactly
/// the value the source gave up.
pub fn post_valued_inflow(
    prior: &Balance,
    key: PartitionKey,
    quantity: Quantity,
    unit_cost: Money,
    total_in: Money,
) -> CoreResult<Posting> {
    let new_quantity = prior.quantity.checked_add(quantity).ok_or_else(|| overflow(key))?;
    let new_total = prior.total.checked_add(total_in).ok_or_else(|| overflow(key))?;
    let new_unit_cost = if new_quantity.is_positive() {
        Money::unit_cost_of(new_total, new_quantity).ok_or_else(|| overflow(key))?
    } else {
        prior.unit_cost
    };

    Ok(Posting {
        quantity_in: quantity,
        cost_in: unit_cost,
        total_in,
        balance: Balance {
            quantity: new_quantity,
            unit_cost: new_unit_cost,
            total: new_total,
        },
        ..Posting::default()
    })
}

/// Posts an outflow at the current average cost.
///
/// ## Errors
/// `CoreError::InsufficientStock` when the partition holds less than
/// `quantity`. Nothing is computed in that case.
///
/// ## Example
/// ```rust
/// use kardex_core::ledger::{post_inflow, post_outflow, Balance};
/// use kardex_core::{CoreError, Money, PartitionKey, ProductId, Quantity, WarehouseId};
///
/// let key = PartitionKey::new(ProductId::new(10), WarehouseId::new(4));
/// let stocked = post_inflow(&Balance::zero(), key, Quantity::from_units(30), Money::from_cents(200))
///     .unwrap()
///     .balance;
///
/// let err = post_outflow(&stocked, key, Quantity::from_units(40)).unwrap_err();
/// assert!(matches!(err, CoreError::InsufficientStock { .. }));
/// ```
pub fn post_outflow(prior: &Balance, key: PartitionKey, quantity: Quantity) -> CoreResult<Posting> {
    if !prior.covers(quantity) {
        return Err(CoreError::InsufficientStock {
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            available: prior.quantity,
            required: quantity,
        });
    }

    let remaining = prior.quantity.checked_sub(quantity).ok_or_else(|| overflow(key))?;
    // A product too large for cents is certainly above the total on hand.
    let total_out = if remaining.is_zero() {
        prior.total
    } else {
        prior
            .unit_cost
            .times_quantity(quantity)
            .map_or(prior.total, |value| value.min(prior.total))
    };

    Ok(Posting {
        quantity_out: quantity,
        cost_out: prior.unit_cost,
        total_out,
        balance: Balance {
            quantity: remaining,
            unit_cost: prior.unit_cost,
            total: prior.total - total_out,
        },
        ..Posting::default()
    })
}

fn overflow(key: PartitionKey) -> CoreError {
    CoreError::BalanceOverflow {
        product_id: key.product_id,
        warehouse_id: key.warehouse_id,
    }
}

// =============================================================================
// New Movement
// =============================================================================

/// A movement computed by the engine, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub key: PartitionKey,
    pub origin: Origin,
    /// Latest movement id the posting was computed from (`None` for the first
    /// movement of the partition). The store refuses the row if another
    /// writer appended after that id in the meantime.
    pub previous_movement_id: Option<MovementId>,
    pub batch_id: String,
    pub detail: String,
    pub posting: Posting,
    pub created_at: DateTime<Utc>,
}

impl NewMovement {
    /// Materializes the stored row once the store has assigned its id.
    pub fn into_movement(self, id: MovementId) -> Movement {
        let p = self.posting;
        Movement {
            id,
            product_id: self.key.product_id,
            warehouse_id: self.key.warehouse_id,
            origin: self.origin,
            previous_movement_id: self.previous_movement_id,
            batch_id: self.batch_id,
            detail: self.detail,
            quantity_in: p.quantity_in,
            cost_in: p.cost_in,
            total_in: p.total_in,
            quantity_out: p.quantity_out,
            cost_out: p.cost_out,
            total_out: p.total_out,
            quantity_balance: p.balance.quantity,
            cost_balance: p.balance.unit_cost,
            total_balance: p.balance.total,
            created_at: self.created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductId, WarehouseId};

    fn key() -> PartitionKey {
        PartitionKey::new(ProductId::new(10), WarehouseId::new(4))
    }

    fn units(n: i64) -> Quantity {
        Quantity::from_units(n)
    }

    #[test]
    fn test_inflow_on_empty_partition() {
        let posting = post_inflow(&Balance::zero(), key(), units(50), Money::from_cents(200)).unwrap();

        assert_eq!(posting.quantity_in, units(50));
        assert_eq!(posting.cost_in.cents(), 200);
        assert_eq!(posting.total_in.cents(), 10_000);
        assert!(posting.quantity_out.is_zero());
        assert_eq!(posting.balance.quantity, units(50));
        assert_eq!(posting.balance.unit_cost.cents(), 200);
        assert_eq!(posting.balance.total.cents(), 10_000);
    }

    #[test]
    fn test_inflow_blends_average_cost() {
        let first = post_inflow(&Balance::zero(), key(), units(50), Money::from_cents(200))
            .unwrap()
            .balance;
        let second = post_inflow(&first, key(), units(50), Money::from_cents(300)).unwrap().balance;

        assert_eq!(second.quantity, units(100));
        assert_eq!(second.total.cents(), 25_000);
        assert_eq!(second.unit_cost.cents(), 250);
    }

    #[test]
    fn test_outflow_at_average_cost() {
        let stocked = post_inflow(&Balance::zero(), key(), units(50), Money::from_cents(200))
            .unwrap()
            .balance;
        let posting = post_outflow(&stocked, key(), units(20)).unwrap();

        assert_eq!(posting.quantity_out, units(20));
        assert_eq!(posting.cost_out.cents(), 200);
        assert_eq!(posting.total_out.cents(), 4_000);
        assert!(posting.quantity_in.is_zero());
        assert_eq!(posting.balance.quantity, units(30));
        assert_eq!(posting.balance.unit_cost.cents(), 200);
        assert_eq!(posting.balance.total.cents(), 6_000);
    }

    #[test]
    fn test_outflow_insufficient_reports_context() {
        let stocked = Balance {
            quantity: units(30),
            unit_cost: Money::from_cents(200),
            total: Money::from_cents(6_000),
        };

        match post_outflow(&stocked, key(), units(40)) {
            Err(CoreError::InsufficientStock {
                product_id,
                warehouse_id,
                available,
                required,
            }) => {
                assert_eq!(product_id, ProductId::new(10));
                assert_eq!(warehouse_id, WarehouseId::new(4));
                assert_eq!(available, units(30));
                assert_eq!(required, units(40));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_outflow_on_empty_partition_fails() {
        assert!(post_outflow(&Balance::zero(), key(), units(1)).is_err());
    }

    #[test]
    fn test_outflow_of_exact_balance_drains_value() {
        // 3 units worth $1.00 → average 33 cents; selling all 3 must take the
        // full $1.00, not 99 cents.
        let stocked = post_valued_inflow(&Balance::zero(), key(), units(3), Money::from_cents(33), Money::from_cents(100))
            .unwrap()
            .balance;
        assert_eq!(stocked.unit_cost.cents(), 33);

        let posting = post_outflow(&stocked, key(), units(3)).unwrap();
        assert_eq!(posting.total_out.cents(), 100);
        assert!(posting.balance.quantity.is_zero());
        assert!(posting.balance.total.is_zero());
    }

    #[test]
    fn test_outflow_never_takes_more_value_than_held() {
        let stocked = Balance {
            quantity: units(3),
            unit_cost: Money::from_cents(34),
            total: Money::from_cents(100),
        };
        let posting = post_outflow(&stocked, key(), "2.9999".parse().unwrap()).unwrap();
        assert!(posting.total_out <= stocked.total);
        assert!(!posting.balance.total.is_negative());
    }

    #[test]
    fn test_zero_cost_inflow_keeps_average_meaningful() {
        let stocked = post_inflow(&Balance::zero(), key(), units(10), Money::from_cents(100))
            .unwrap()
            .balance;
        let gifted = post_inflow(&stocked, key(), units(10), Money::zero()).unwrap().balance;
        assert_eq!(gifted.unit_cost.cents(), 50);
    }

    #[test]
    fn test_balance_from_latest() {
        assert_eq!(Balance::from_latest(None), Balance::zero());
    }

    #[test]
    fn test_new_movement_materializes_balance_columns() {
        let posting = post_inflow(&Balance::zero(), key(), units(5), Money::from_cents(150)).unwrap();
        let new = NewMovement {
            key: key(),
            origin: Origin::Purchase { purchase_order_id: 1 },
            previous_movement_id: None,
            batch_id: "batch".to_string(),
            detail: "Purchase - Purchase Order #1".to_string(),
            posting,
            created_at: Utc::now(),
        };

        let movement = new.into_movement(MovementId::new(42));
        assert_eq!(movement.id, MovementId::new(42));
        assert_eq!(movement.quantity_balance, units(5));
        assert_eq!(movement.total_balance.cents(), 750);
        assert_eq!(Balance::from_movement(&movement), posting.balance);
    }

    #[test]
    fn test_inflow_value_too_large_for_cents_is_refused() {
        // 1,000,000 units at 10^15 cents: 10^21 cents, past i64
        let err = post_inflow(
            &Balance::zero(),
            key(),
            units(1_000_000),
            Money::from_cents(1_000_000_000_000_000),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::BalanceOverflow { .. }));
    }

    #[test]
    fn test_inflow_quantity_overflow_is_refused() {
        let half = Quantity::from_scaled(i64::MAX / 2 + 1);
        let first = post_inflow(&Balance::zero(), key(), half, Money::zero()).unwrap().balance;

        match post_inflow(&first, key(), half, Money::zero()) {
            Err(CoreError::BalanceOverflow {
                product_id,
                warehouse_id,
            }) => {
                assert_eq!(product_id, ProductId::new(10));
                assert_eq!(warehouse_id, WarehouseId::new(4));
            }
            other => panic!("expected BalanceOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_inflow_total_overflow_is_refused() {
        let rich = Balance {
            quantity: units(1),
            unit_cost: Money::from_cents(i64::MAX - 10),
            total: Money::from_cents(i64::MAX - 10),
        };
        let err = post_valued_inflow(&rich, key(), units(1), Money::from_cents(20), Money::from_cents(20)).unwrap_err();
        assert!(matches!(err, CoreError::BalanceOverflow { .. }));
    }

    #[test]
    fn test_outflow_value_beyond_cents_is_capped_by_total() {
        let stocked = Balance {
            quantity: Quantity::from_scaled(i64::MAX / 2),
            unit_cost: Money::from_cents(1_000_000_000_000),
            total: Money::from_cents(i64::MAX),
        };
        let posting = post_outflow(&stocked, key(), units(1_000_000_000)).unwrap();
        assert_eq!(posting.total_out, stocked.total);
        assert!(posting.balance.total.is_zero());
    }

    // =========================================================================
    // Properties
    // =========================================================================

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        In { scaled: i64, cents: i64 },
        Out { scaled: i64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..5_000_000, 0i64..100_000).prop_map(|(scaled, cents)| Op::In { scaled, cents }),
            (1i64..5_000_000).prop_map(|scaled| Op::Out { scaled }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any sequence of postings serially leaves a
        /// balance equal to the accepted inflows minus the accepted outflows,
        /// and no balance (quantity or value) ever goes negative.
        #[test]
        fn serial_postings_carry_exact_balance(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut balance = Balance::zero();
            let mut expected = Quantity::zero();

            for op in ops {
                match op {
                    Op::In { scaled, cents } => {
                        let q = Quantity::from_scaled(scaled);
                        balance = post_inflow(&balance, key(), q, Money::from_cents(cents)).unwrap().balance;
                        expected += q;
                    }
                    Op::Out { scaled } => {
                        let q = Quantity::from_scaled(scaled);
                        match post_outflow(&balance, key(), q) {
                            Ok(posting) => {
                                prop_assert!(posting.total_out <= balance.total);
                                balance = posting.balance;
                                expected -= q;
                            }
                            Err(CoreError::InsufficientStock { available, required, .. }) => {
                                prop_assert!(available < required);
                                prop_assert_eq!(available, balance.quantity);
                            }
                            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                        }
                    }
                }

                prop_assert_eq!(balance.quantity, expected);
                prop_assert!(!balance.quantity.is_negative());
                prop_assert!(!balance.total.is_negative());
                if balance.quantity.is_zero() {
                    prop_assert!(balance.total.is_zero());
                }
            }
        }

        /// Property: a transfer's inbound leg carries exactly the value its
        /// outbound leg removed.
        #[test]
        fn transfer_legs_conserve_value(
            stocked in 1i64..5_000_000,
            cents in 0i64..100_000,
            moved in 1i64..5_000_000,
        ) {
            let source = post_inflow(&Balance::zero(), key(), Quantity::from_scaled(stocked), Money::from_cents(cents))
                .unwrap()
                .balance;
            let quantity = Quantity::from_scaled(moved);

            if let Ok(out) = post_outflow(&source, key(), quantity) {
                let inbound = post_valued_inflow(&Balance::zero(), key(), quantity, out.cost_out, out.total_out).unwrap();
                prop_assert_eq!(out.balance.quantity + inbound.balance.quantity, source.quantity);
                prop_assert_eq!(out.balance.total + inbound.balance.total, source.total);
            }
        }
    }
}
