use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::interest::{ensure_non_negative, ensure_non_negative_rate, SimpleInterest};

/// principal × rate × years
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleInterestCalculator;

impl SimpleInterest for SimpleInterestCalculator {
    fn calculate(&self, principal: Money, annual_rate: Rate, years: Decimal) -> Result<Money> {
        ensure_non_negative("principal", principal)?;
        ensure_non_negative_rate(annual_rate)?;
        if years < Decimal::ZERO {
            return Err(AmortizationError::invalid(format!(
                "time in years must not be negative, got {}",
                years
            )));
        }

        Ok((principal * (annual_rate.as_decimal() * years)).round_currency())
    }
}
