//! # Money Module
//!
//! Provides the `Money` type for unit costs and movement totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A Kardex carries totals forward on every row; float error compounds  │
//! │  over thousands of movements.                                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    quantity × unit cost is computed in i128 and rounded once           │
//! │    (half to even) back to cents                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::{Money, Quantity};
//!
//! let unit_cost = Money::from_cents(200); // $2.00
//! let total = unit_cost.times_quantity(Quantity::from_units(50)).unwrap();
//! assert_eq!(total.cents(), 10_000);      // $100.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::{Quantity, QUANTITY_SCALE};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: arithmetic on differences stays natural
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::Money;
    ///
    /// let cost = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(cost.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiplies a unit cost by a (fractional) quantity.
    ///
    /// Returns `None` when the result doesn't fit in cents.
    ///
    /// ## Bankers Rounding
    /// The exact product has up to 4 extra decimals; it is rounded half to
    /// even so that large numbers of movements don't drift in one direction.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::{Money, Quantity};
    ///
    /// let per_kg = Money::from_cents(333);           // $3.33 / kg
    /// let rice: Quantity = "2.5".parse().unwrap();  // 2.5 kg
    /// // 8.325 → 8.32 (half to even)
    /// assert_eq!(per_kg.times_quantity(rice).unwrap().cents(), 832);
    /// ```
    pub fn times_quantity(&self, qty: Quantity) -> Option<Money> {
        let exact = i128::from(self.0) * i128::from(qty.scaled());
        i64::try_from(div_round_half_even(exact, i128::from(QUANTITY_SCALE)))
            .ok()
            .map(Money)
    }

    /// Average cost of one unit given a total value and a quantity.
    ///
    /// Zero for a zero quantity (nothing to average over); `None` when the
    /// average doesn't fit in cents.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::{Money, Quantity};
    ///
    /// // 50 units worth $100.00 plus 25 units worth $62.50
    /// let avg = Money::unit_cost_of(Money::from_cents(16_250), Quantity::from_units(75)).unwrap();
    /// assert_eq!(avg.cents(), 217); // $2.1666… → $2.17
    /// ```
    pub fn unit_cost_of(total: Money, qty: Quantity) -> Option<Money> {
        if qty.is_zero() {
            return Some(Money::zero());
        }
        let mut numerator = i128::from(total.0) * i128::from(QUANTITY_SCALE);
        let mut denominator = i128::from(qty.scaled());
        if denominator < 0 {
            denominator = -denominator;
            numerator = -numerator;
        }
        i64::try_from(div_round_half_even(numerator, denominator)).ok().map(Money)
    }
}

/// Integer division rounding half to even. `den` must be positive.
fn div_round_half_even(num: i128, den: i128) -> i128 {
    let quotient = num.div_euclid(den);
    let remainder = num.rem_euclid(den);
    let twice = remainder * 2;

    if twice > den || (twice == den && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$12.34`; for logs and CLI output only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
