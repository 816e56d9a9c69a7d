//! # Quantity Module
//!
//! Fixed-point stock quantities.
//!
//! ## Why Fixed Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kitchen stock is not always whole units: 2.5 kg of rice, 0.75 l of    │
//! │  oil. Floats drift once balances are carried forward row after row:    │
//! │                                                                         │
//! │    0.1 + 0.2 - 0.3 = 0.000000000000000055  ❌ "sufficient" stock lies  │
//! │                                                                         │
//! │  OUR SOLUTION: i64 ten-thousandths (4 decimals, like decimal(10,4))    │
//! │    2.5 kg  → 25_000                                                    │
//! │    0.75 l  →  7_500                                                    │
//! │  Comparisons and running balances are exact.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::Quantity;
//!
//! let received = Quantity::from_units(50);
//! let sold: Quantity = "20.5".parse().unwrap();
//! assert_eq!((received - sold).to_string(), "29.5");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Number of scaled steps in one unit (4 decimal places).
pub const QUANTITY_SCALE: i64 = 10_000;

/// Number of decimal places a quantity can carry.
pub const QUANTITY_DECIMALS: usize = 4;

// =============================================================================
// Quantity Type
// =============================================================================

/// A stock quantity with 4 decimal places, stored as ten-thousandths.
///
/// Serialized as a decimal string (`"29.5"`) so clients never see the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Quantity(#[ts(type = "string")] i64);

impl Quantity {
    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * QUANTITY_SCALE)
    }

    /// Creates a quantity from its scaled representation (ten-thousandths).
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::Quantity;
    ///
    /// let half = Quantity::from_scaled(5_000);
    /// assert_eq!(half.to_string(), "0.5");
    /// ```
    #[inline]
    pub const fn from_scaled(scaled: i64) -> Self {
        Quantity(scaled)
    }

    /// Returns the scaled representation (what the database stores).
    #[inline]
    pub const fn scaled(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit part, truncated toward zero.
    #[inline]
    pub const fn whole_units(&self) -> i64 {
        self.0 / QUANTITY_SCALE
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
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

    /// Subtraction that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Quantity)
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

// =============================================================================
// Formatting & Parsing
// =============================================================================

/// Prints the shortest exact decimal: `30`, `2.5`, `0.0125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / QUANTITY_SCALE as u64;
        let frac = abs % QUANTITY_SCALE as u64;

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }

        let digits = format!("{:0width$}", frac, width = QUANTITY_DECIMALS);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    /// Parses `"12"`, `"12.5"`, `"-0.25"`. More than 4 decimals is rejected
    /// rather than silently rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole_str, frac_str) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid("empty value"));
        }
        if frac_str.len() > QUANTITY_DECIMALS {
            return Err(invalid("at most 4 decimal places are supported"));
        }
        if !whole_str.chars().all(|c| c.is_ascii_digit()) || !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }

        let whole: i64 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| invalid("value too large"))?
        };
        let frac: i64 = if frac_str.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_str, width = QUANTITY_DECIMALS);
            padded.parse().map_err(|_| invalid("not a decimal number"))?
        };

        let scaled = whole
            .checked_mul(QUANTITY_SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| invalid("value too large"))?;

        Ok(Quantity(if negative { -scaled } else { scaled }))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units_and_scaled() {
        let q = Quantity::from_units(50);
        assert_eq!(q.scaled(), 500_000);
        assert_eq!(q.whole_units(), 50);
        assert_eq!(Quantity::from_scaled(25_000).whole_units(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(30).to_string(), "30");
        assert_eq!(Quantity::from_scaled(25_000).to_string(), "2.5");
        assert_eq!(Quantity::from_scaled(125).to_string(), "0.0125");
        assert_eq!(Quantity::from_scaled(-7_500).to_string(), "-0.75");
        assert_eq!(Quantity::zero().to_string(), "0");
    }

    #[test]
    fn test_parse() {
        assert_eq!("12".parse::<Quantity>().unwrap(), Quantity::from_units(12));
        assert_eq!("2.5".parse::<Quantity>().unwrap(), Quantity::from_scaled(25_000));
        assert_eq!(".75".parse::<Quantity>().unwrap(), Quantity::from_scaled(7_500));
        assert_eq!("-0.25".parse::<Quantity>().unwrap(), Quantity::from_scaled(-2_500));
        assert_eq!(" 3.0001 ".parse::<Quantity>().unwrap(), Quantity::from_scaled(30_001));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Quantity>().is_err());
        assert!(".".parse::<Quantity>().is_err());
        assert!("1.23456".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
        assert!("1e3".parse::<Quantity>().is_err());
        assert!("99999999999999999999".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let a: Quantity = "0.1".parse().unwrap();
        let b: Quantity = "0.2".parse().unwrap();
        let c: Quantity = "0.3".parse().unwrap();
        assert!((a + b - c).is_zero());

        let total: Quantity = vec![a, b, c].into_iter().sum();
        assert_eq!(total.to_string(), "0.6");
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let q = Quantity::from_scaled(295_000);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"29.5\"");

        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);

        assert!(serde_json::from_str::<Quantity>("\"1.000001\"").is_err());
        assert!(serde_json::from_str::<Quantity>("295000").is_err());
    }

    #[test]
    fn test_typescript_binding_is_string() {
        assert_eq!(Quantity::inline(), "string");
    }
}
