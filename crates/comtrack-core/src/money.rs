//! # Money Module
//!
//! Provides the `Money` type for commission amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing a year of monthly commissions as f64:                          │
//! │    104976.24 + 0.1 + 0.2 ... drifts in the last digit                   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise (1/100 rupee)                              │
//! │    SUM(amount) runs over INTEGER columns in SQLite                      │
//! │    Grand totals are i64 additions, exact by construction               │
//! │    f64 appears only when computing a percentage change                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! JSON carries money as a decimal string with two fractional digits
//! (`"104976.24"`), the same shape a `DECIMAL(15,2)` column would produce.
//!
//! ## Usage
//! ```rust
//! use comtrack_core::money::Money;
//!
//! let amount: Money = "104976.24".parse().unwrap();
//! assert_eq!(amount.paise(), 10_497_624);
//! assert_eq!(amount.to_string(), "104976.24");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (the smallest rupee unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: corrections can produce negative adjustments
/// - **Single field tuple struct**: stored as-is in an INTEGER column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Divides by a count, rounding half away from zero.
    ///
    /// Used for monthly averages and mean transaction size. A divisor of
    /// zero is treated as one.
    ///
    /// ## Example
    /// ```rust
    /// use comtrack_core::money::Money;
    ///
    /// // ₹10.00 over 3 months = ₹3.33
    /// assert_eq!(Money::from_paise(1000).divide_round(3).paise(), 333);
    /// // ₹0.05 over 2 = ₹0.03 (0.025 rounds away from zero)
    /// assert_eq!(Money::from_paise(5).divide_round(2).paise(), 3);
    /// ```
    pub fn divide_round(&self, divisor: u32) -> Money {
        let divisor = i128::from(divisor.max(1));
        let value = i128::from(self.0);
        let half = divisor / 2;
        let rounded = if value >= 0 {
            (value + half) / divisor
        } else {
            (value - half) / divisor
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Parsing
// =============================================================================

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses `[+-]digits[.d[d]]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::invalid_format("amount", reason);

        let s = s.trim();
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
            None => return Err(invalid("empty amount")),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal point"));
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let rupees: i64 = whole.parse().map_err(|_| invalid("amount is too large"))?;
        let paise_part: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))?,
        };

        let paise = rupees
            .checked_mul(100)
            .and_then(|p| p.checked_add(paise_part))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -paise } else { paise }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal with two fractional digits, e.g. `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `"1234.50"` or a whole-rupee JSON integer.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Whole(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Raw::Whole(rupees) => rupees
                .checked_mul(100)
                .map(Money)
                .ok_or_else(|| serde::de::Error::custom("amount is too large")),
        }
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
