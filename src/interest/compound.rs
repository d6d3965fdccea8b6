use rust_decimal::Decimal;

use crate::decimal::{pow_unrounded, Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::interest::{ensure_non_negative, ensure_non_negative_rate, CompoundInterest};
use crate::types::PaymentFrequency;

/// principal × [(1 + periodic rate)^periods − 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundInterestCalculator;

impl CompoundInterestCalculator {
    /// principal plus compound interest
    pub fn future_value(
        &self,
        present_value: Money,
        annual_rate: Rate,
        periods: u32,
        frequency: PaymentFrequency,
    ) -> Result<Money> {
        let interest = self.calculate(present_value, annual_rate, periods, frequency)?;
        Ok(present_value.round_currency() + interest)
    }

    /// discount a future amount back over `periods`
    pub fn present_value(
        &self,
        future_value: Money,
        annual_rate: Rate,
        periods: u32,
        frequency: PaymentFrequency,
    ) -> Result<Money> {
        ensure_non_negative("future value", future_value)?;
        ensure_non_negative_rate(annual_rate)?;

        let factor = compound_factor(annual_rate, periods, frequency)?;
        let discounted = future_value
            .as_decimal()
            .checked_div(factor)
            .ok_or(AmortizationError::DivisionByZero)?;
        Ok(Money::from_decimal(discounted).round_currency())
    }
}

impl CompoundInterest for CompoundInterestCalculator {
    fn calculate(
        &self,
        principal: Money,
        annual_rate: Rate,
        periods: u32,
        frequency: PaymentFrequency,
    ) -> Result<Money> {
        ensure_non_negative("principal", principal)?;
        ensure_non_negative_rate(annual_rate)?;

        let factor = compound_factor(annual_rate, periods, frequency)?;
        Ok((principal * (factor - Decimal::ONE)).round_currency())
    }
}

/// (1 + annual rate / n)^periods
fn compound_factor(annual_rate: Rate, periods: u32, frequency: PaymentFrequency) -> Result<Decimal> {
    let periodic_rate = annual_rate.per_period(frequency.periods_per_year()).as_decimal();
    pow_unrounded(Decimal::ONE + periodic_rate, u64::from(periods))
}
