//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    Rp 15.000 is stored as 15000: exact, always                          │
//! │    Splitting 10000 / 3 = 3333 (×3 = 9999): we KNOW we lost one unit     │
//! │    and handle it explicitly                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and re-credits
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (the smallest currency unit).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition - returns None on overflow.
    #[inline]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked multiplication by a quantity - returns None on overflow.
    #[inline]
    pub fn checked_mul(self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Calculates the tax amount at the given rate.
    ///
    /// Uses round-half-up on the basis-point product so that a line of
    /// Rp 10.000 at 11.00% (1100 bps) yields exactly Rp 1.100.
    pub fn tax(self, rate: TaxRate) -> Money {
        let numerator = self.0 * rate.bps() as i64;
        Money((numerator + 5_000) / 10_000)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;
    fn mul(self, qty: i64) -> Money {
        Money(self.0 * qty)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000.
/// 1100 bps = 11% (Indonesian PPN), stored exactly as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_exact() {
        let a = Money::from_minor(15_000);
        let b = Money::from_minor(7_500);
        assert_eq!((a + b).minor(), 22_500);
        assert_eq!((a - b).minor(), 7_500);
        assert_eq!((b * 3).minor(), 22_500);
    }

    #[test]
    fn tax_rounds_half_up() {
        // Rp 10.000 at 11% = Rp 1.100 exactly
        let base = Money::from_minor(10_000);
        assert_eq!(base.tax(TaxRate::from_bps(1_100)).minor(), 1_100);

        // 999 at 8.25% = 82.4175 -> 82
        let odd = Money::from_minor(999);
        assert_eq!(odd.tax(TaxRate::from_bps(825)).minor(), 82);

        // 1000 at 8.25% = 82.5 -> 83 (half rounds up)
        let half = Money::from_minor(1_000);
        assert_eq!(half.tax(TaxRate::from_bps(825)).minor(), 83);
    }

    #[test]
    fn zero_tax_is_zero() {
        assert!(Money::from_minor(5_000).tax(TaxRate::zero()).is_zero());
    }

    #[test]
    fn negative_amounts_for_refunds() {
        let credit = Money::from_minor(-4_000);
        assert!(credit.is_negative());
        assert_eq!((credit + Money::from_minor(4_000)).minor(), 0);
    }

    #[test]
    fn checked_ops_catch_overflow() {
        let max = Money::from_minor(i64::MAX);
        assert!(max.checked_add(Money::from_minor(1)).is_none());
        assert!(max.checked_mul(2).is_none());
        assert_eq!(
            Money::from_minor(10).checked_mul(3),
            Some(Money::from_minor(30))
        );
    }
}
