use rust_decimal::Decimal;

use crate::decimal::{pow_unrounded, Rate};
use crate::errors::Result;
use crate::interest::ensure_non_negative_rate;
use crate::types::PaymentFrequency;

/// nominal to effective annual rate conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectiveRateCalculator;

impl EffectiveRateCalculator {
    /// annual percentage yield: (1 + apr / n)^n − 1
    pub fn calculate_apy(&self, apr: Rate, frequency: PaymentFrequency) -> Result<Rate> {
        ensure_non_negative_rate(apr)?;

        let n = frequency.periods_per_year();
        let base = Decimal::ONE + apr.per_period(n).as_decimal();
        let factor = pow_unrounded(base, u64::from(n))?;
        Ok(Rate::from_decimal(factor - Decimal::ONE))
    }
}

/// restates a rate quoted per one frequency as a rate per another
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestRateConverter;

impl InterestRateConverter {
    /// rate × periods(from) / periods(to)
    pub fn convert(&self, rate: Rate, from: PaymentFrequency, to: PaymentFrequency) -> Result<Rate> {
        ensure_non_negative_rate(rate)?;

        let scaled = rate.as_decimal() * Decimal::from(from.periods_per_year())
            / Decimal::from(to.periods_per_year());
        Ok(Rate::from_decimal(scaled))
    }
}
