use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::interest::{ensure_non_negative, ensure_non_negative_rate, PeriodicInterest};
use crate::types::PaymentFrequency;

/// balance × annual rate / periods per year, rounded to cents
///
/// This is the convention the schedule generator charges each period.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicInterestCalculator;

impl PeriodicInterestCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl PeriodicInterest for PeriodicInterestCalculator {
    fn calculate(&self, balance: Money, annual_rate: Rate, frequency: PaymentFrequency) -> Result<Money> {
        ensure_non_negative("balance", balance)?;
        ensure_non_negative_rate(annual_rate)?;

        let periodic_rate = annual_rate.per_period(frequency.periods_per_year());
        Ok((balance * periodic_rate.as_decimal()).round_currency())
    }
}
