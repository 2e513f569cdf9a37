//! # Money Module
//!
//! Provides the `Money` type for prices, sale totals and commissions.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Settlement of showcase SC-1:                                           │
//! │    3 rings × R$ 99,90 at 12.5% commission                               │
//! │                                                                         │
//! │  Floating point: 3 × 99.9 × 0.125 = 37.462499999999995                  │
//! │  Integer cents:  29970 × 1250 / 10000 = 3746.25 → 3746 cents            │
//! │                                                                         │
//! │  We store cents and round exactly once, at the line level.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mostruario_core::money::Money;
//! use mostruario_core::types::CommissionRate;
//!
//! let unit_price = Money::from_cents(10000); // R$ 100,00
//! let line_total = unit_price.multiply_quantity(3);
//! let commission = line_total.calculate_commission(CommissionRate::from_bps(1000));
//!
//! assert_eq!(line_total.cents(), 30000);
//! assert_eq!(commission.cents(), 3000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::CommissionRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (centavos).
///
/// ## Where Money is Used
/// ```text
/// Product.cost_price / selling_price ──► ProductPricing override
///                                             │
///                                             ▼
///                                  HoldingLine.resale_price
///
/// SoldProduct.unit_price × quantity ──► line total ──► Sale total
///                                  └──► × commission ──► Sale commission
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use mostruario_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
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

    /// Returns the major unit (reais) portion.
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

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// Read paths use this on rows whose prices and quantities were bounded
    /// on the way in. Anything about to be written goes through
    /// [`Money::checked_multiply_quantity`].
    ///
    /// ## Example
    /// ```rust
    /// use mostruario_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(4590);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 13770);
    /// assert_eq!(Money::from_cents(i64::MAX).multiply_quantity(2).cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies money by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use mostruario_core::money::Money;
    ///
    /// let amounts = [Money::from_cents(100), Money::from_cents(250)];
    /// assert_eq!(Money::checked_sum(amounts), Some(Money::from_cents(350)));
    /// assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);
    /// ```
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Calculates a commission on this amount.
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// `i128` keeps large line totals from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use mostruario_core::money::Money;
    /// use mostruario_core::types::CommissionRate;
    ///
    /// let line_total = Money::from_cents(29970);
    /// let rate = CommissionRate::from_bps(1250); // 12.5%
    ///
    /// // 29970 × 12.5% = 3746.25 → 3746
    /// assert_eq!(line_total.calculate_commission(rate).cents(), 3746);
    /// ```
    pub fn calculate_commission(&self, rate: CommissionRate) -> Money {
        let commission = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(commission as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

// Add/Sub saturate so totals over stored rows never panic.

/// Debug-friendly rendering; UI layers do their own localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R$ {},{:02}", sign, self.major().abs(), self.minor())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10,99");
        assert_eq!(Money::from_cents(5).to_string(), "R$ 0,05");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!(a.multiply_quantity(3).cents(), 3000);

        let mut c = a;
        c += b;
        c -= Money::from_cents(50);
        assert_eq!(c.cents(), 1200);
    }

    #[test]
    fn test_commission_basic() {
        // 3 pieces at R$ 100,00, 10% commission
        let total = Money::from_cents(10000).multiply_quantity(3);
        let commission = total.calculate_commission(CommissionRate::from_bps(1000));
        assert_eq!(total.cents(), 30000);
        assert_eq!(commission.cents(), 3000);
    }

    #[test]
    fn test_commission_rounding() {
        // 0.5 cent rounds up
        let commission = Money::from_cents(5).calculate_commission(CommissionRate::from_bps(1000));
        assert_eq!(commission.cents(), 1);

        // 0.4 cent rounds down
        let commission = Money::from_cents(4).calculate_commission(CommissionRate::from_bps(1000));
        assert_eq!(commission.cents(), 0);
    }

    #[test]
    fn test_commission_bounds() {
        let total = Money::from_cents(12345);
        assert!(total.calculate_commission(CommissionRate::zero()).is_zero());
        assert_eq!(
            total.calculate_commission(CommissionRate::from_bps(10000)),
            total
        );
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_add(huge).map(|m| m.cents()), Some(i64::MAX - 1));
        assert_eq!(huge.checked_add(huge).and_then(|m| m.checked_add(Money::from_cents(2))), None);
        assert_eq!(
            Money::from_cents(4590).checked_multiply_quantity(3),
            Some(Money::from_cents(13770))
        );
    }

    #[test]
    fn test_saturating_reads_do_not_panic() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.multiply_quantity(3).cents(), i64::MAX);
        let total: Money = [huge, huge, huge].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 200, 300].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 600);
    }
}
