//! # Money Module
//!
//! Provides the `Money` type for handling EGP amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Storefront subtotal: 55.10 EGP, points cap 10%                         │
//! │    55.1 * 10 / 100 = 5.510000000000001   ❌ drifts                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Piasters (1 EGP = 100 piasters)                  │
//! │    5510 * 10 = 55100 ≤ discount * 100 ?  ✅ exact comparison           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use souq_core::money::Money;
//!
//! let subtotal = Money::from_pounds(500);
//! let shipping = Money::from_piasters(2000); // 20.00 EGP
//!
//! assert_eq!((subtotal + shipping).piasters(), 52000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Piasters in one Egyptian pound.
pub const PIASTERS_PER_POUND: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in piasters (the smallest EGP unit).
///
/// Signed so that intermediate figures such as `subtotal - discount` can be
/// represented before clamping. Arithmetic saturates at the `i64` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from piasters.
    ///
    /// ## Example
    /// ```rust
    /// use souq_core::money::Money;
    ///
    /// let price = Money::from_piasters(1099); // 10.99 EGP
    /// assert_eq!(price.piasters(), 1099);
    /// ```
    #[inline]
    pub const fn from_piasters(piasters: i64) -> Self {
        Money(piasters)
    }

    /// Creates a Money value from whole pounds.
    #[inline]
    pub const fn from_pounds(pounds: i64) -> Self {
        Money(pounds.saturating_mul(PIASTERS_PER_POUND))
    }

    /// Returns the value in piasters.
    #[inline]
    pub const fn piasters(&self) -> i64 {
        self.0
    }

    /// Returns the whole-pound portion, truncated toward zero.
    ///
    /// ## Example
    /// ```rust
    /// use souq_core::money::Money;
    ///
    /// assert_eq!(Money::from_piasters(1099).pounds(), 10);
    /// assert_eq!(Money::from_piasters(-550).pounds(), -5);
    /// ```
    #[inline]
    pub const fn pounds(&self) -> i64 {
        self.0 / PIASTERS_PER_POUND
    }

    /// Returns the piaster portion (always 0-99).
    #[inline]
    pub const fn piasters_part(&self) -> i64 {
        (self.0 % PIASTERS_PER_POUND).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// Payable totals never go below zero even when a discount is larger
    /// than what is left to pay.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Returns `percent`% of this amount, rounded down to a whole piaster.
    ///
    /// ## Example
    /// ```rust
    /// use souq_core::money::Money;
    ///
    /// // 10% of 55.55 EGP = 5.555 EGP -> 5.55 EGP
    /// let cap = Money::from_piasters(5555).percentage_floor(10);
    /// assert_eq!(cap.piasters(), 555);
    /// ```
    pub fn percentage_floor(&self, percent: u32) -> Money {
        // i128 so that large subtotals cannot overflow the multiplication
        let scaled = self.0 as i128 * percent as i128;
        Money(saturate(scaled.div_euclid(100)))
    }

    /// Checks whether this amount is strictly greater than `percent`% of
    /// `base`, without rounding either side.
    pub fn exceeds_percentage_of(&self, base: Money, percent: u32) -> bool {
        self.0 as i128 * 100 > base.0 as i128 * percent as i128
    }

    /// Number of `unit`s needed to cover this amount (ceiling).
    ///
    /// Returns zero for a non-positive `unit`.
    pub fn units_ceil(&self, unit: Money) -> i64 {
        if unit.0 <= 0 {
            return 0;
        }
        let whole = self.0.div_euclid(unit.0);
        if self.0.rem_euclid(unit.0) == 0 {
            whole
        } else {
            whole + 1
        }
    }
}

/// Narrows an `i128` intermediate back to `i64`, clamping at the bounds.
pub(crate) fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. The storefront formats Arabic numerals itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}EGP {}.{:02}",
            sign,
            self.pounds().abs(),
            self.piasters_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a count (e.g. ratio groups × discount per group).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
