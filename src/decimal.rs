use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{AmortizationError, Result};

/// scale kept for intermediate values
pub const INTERNAL_PRECISION: u32 = 10;
/// scale of every currency value at the boundary
pub const OUTPUT_PRECISION: u32 = 2;

/// round half-up (away from zero on a tie)
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// arbitrary-precision arithmetic primitives
///
/// Every operation returns its result rounded half-up to `precision` places, so long chains of
/// operations (hundreds of schedule periods) never pick up binary floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalMath {
    pub precision: u32,
}

impl Default for DecimalMath {
    fn default() -> Self {
        Self {
            precision: INTERNAL_PRECISION,
        }
    }
}

impl DecimalMath {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// parse a decimal-exact string
    pub fn parse(value: &str) -> Result<Decimal> {
        Decimal::from_str(value.trim())
            .map_err(|e| AmortizationError::invalid(format!("not a decimal value '{}': {}", value, e)))
    }

    /// render with exactly `places` fractional digits
    pub fn format(value: Decimal, places: u32) -> String {
        let mut rounded = round_half_up(value, places);
        rounded.rescale(places);
        rounded.to_string()
    }

    pub fn add(&self, a: Decimal, b: Decimal) -> Decimal {
        self.fit(a + b)
    }

    pub fn subtract(&self, a: Decimal, b: Decimal) -> Decimal {
        self.fit(a - b)
    }

    pub fn multiply(&self, a: Decimal, b: Decimal) -> Decimal {
        self.fit(a * b)
    }

    pub fn divide(&self, a: Decimal, b: Decimal) -> Result<Decimal> {
        if b.is_zero() {
            return Err(AmortizationError::DivisionByZero);
        }
        a.checked_div(b)
            .map(|q| self.fit(q))
            .ok_or_else(|| AmortizationError::runtime(format!("overflow dividing {} by {}", a, b)))
    }

    /// integer power; negative exponents go through the reciprocal
    pub fn power(&self, base: Decimal, exponent: i64) -> Result<Decimal> {
        let raised = pow_unrounded(base, exponent.unsigned_abs())?;
        if exponent < 0 {
            if raised.is_zero() {
                return Err(AmortizationError::DivisionByZero);
            }
            return Ok(self.fit(Decimal::ONE / raised));
        }
        Ok(self.fit(raised))
    }

    pub fn round(&self, value: Decimal, places: u32) -> Decimal {
        round_half_up(value, places)
    }

    pub fn compare(&self, a: Decimal, b: Decimal) -> Ordering {
        self.fit(a).cmp(&self.fit(b))
    }

    pub fn min(&self, a: Decimal, b: Decimal) -> Decimal {
        self.fit(a.min(b))
    }

    pub fn max(&self, a: Decimal, b: Decimal) -> Decimal {
        self.fit(a.max(b))
    }

    pub fn abs(&self, value: Decimal) -> Decimal {
        self.fit(value.abs())
    }

    fn fit(&self, value: Decimal) -> Decimal {
        round_half_up(value, self.precision)
    }
}

/// exponentiation by squaring at full decimal precision
pub(crate) fn pow_unrounded(base: Decimal, exponent: u64) -> Result<Decimal> {
    let mut result = Decimal::ONE;
    let mut factor = base;
    let mut remaining = exponent;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result
                .checked_mul(factor)
                .ok_or_else(|| AmortizationError::runtime(format!("overflow raising {} to {}", base, exponent)))?;
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = factor
                .checked_mul(factor)
                .ok_or_else(|| AmortizationError::runtime(format!("overflow raising {} to {}", base, exponent)))?;
        }
    }
    Ok(result)
}

/// currency amount carried at internal precision, rounded to cents at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round_half_up(d, INTERNAL_PRECISION))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self> {
        Ok(Money::from_decimal(DecimalMath::parse(s)?))
    }

    /// create from a whole currency amount
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from cents
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, OUTPUT_PRECISION))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round half-up to `dp` places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(round_half_up(self.0, dp))
    }

    /// round half-up to cents
    pub fn round_currency(&self) -> Self {
        self.round_dp(OUTPUT_PRECISION)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// clamp negative values to zero
    pub fn non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    /// within `tolerance` of zero
    pub fn is_negligible(&self, tolerance: Money) -> bool {
        self.abs() < tolerance
    }

    pub fn checked_div(self, divisor: Decimal) -> Result<Self> {
        if divisor.is_zero() {
            return Err(AmortizationError::DivisionByZero);
        }
        Ok(Money::from_decimal(self.0 / divisor))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = AmortizationError;

    fn from_str(s: &str) -> Result<Self> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money::from_decimal(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money::from_decimal(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        *self = *self - other;
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money::from_decimal(self.0 * other)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

/// annual interest rate stored as a decimal fraction (0.05 for 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from a percentage figure (e.g., 5.0 for 5%)
    pub fn from_percent(p: Decimal) -> Self {
        Rate(p / Decimal::ONE_HUNDRED)
    }

    /// create from a whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::ONE_HUNDRED)
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10_000))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// annual rates on a loan must lie in [0, 1]
    pub fn is_unit_interval(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }

    /// rate for one of `periods_per_year` equal periods
    pub fn per_period(&self, periods_per_year: u32) -> Rate {
        Rate(self.0 / Decimal::from(periods_per_year))
    }

    pub fn monthly_rate(&self) -> Rate {
        self.per_period(12)
    }

    pub fn daily_rate(&self) -> Rate {
        self.per_period(365)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}
