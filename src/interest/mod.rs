pub mod compound;
pub mod daily;
pub mod periodic;
pub mod rates;
pub mod simple;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::types::PaymentFrequency;

pub use compound::CompoundInterestCalculator;
pub use daily::{DailyInterestCalculator, DayCountBasis};
pub use periodic::PeriodicInterestCalculator;
pub use rates::{EffectiveRateCalculator, InterestRateConverter};
pub use simple::SimpleInterestCalculator;

/// interest calculation result with the inputs that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCalculation {
    pub interest_amount: Money,
    pub daily_rate: Rate,
    pub days: u32,
    pub principal_base: Money,
    pub calculation_method: String,
}

/// interest for one payment period of a given frequency
pub trait PeriodicInterest {
    fn calculate(&self, balance: Money, annual_rate: Rate, frequency: PaymentFrequency) -> Result<Money>;
}

/// simple (non-compounding) interest over a span of years
pub trait SimpleInterest {
    fn calculate(&self, principal: Money, annual_rate: Rate, years: Decimal) -> Result<Money>;
}

/// interest earned by compounding over whole periods
pub trait CompoundInterest {
    fn calculate(
        &self,
        principal: Money,
        annual_rate: Rate,
        periods: u32,
        frequency: PaymentFrequency,
    ) -> Result<Money>;
}

/// day-based accrual
pub trait DailyInterest {
    fn calculate_daily(&self, balance: Money, annual_rate: Rate) -> Result<Money>;

    fn calculate_accrual(
        &self,
        balance: Money,
        annual_rate: Rate,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Money>;
}

pub(crate) fn ensure_non_negative(name: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(AmortizationError::invalid(format!(
            "{} must not be negative, got {}",
            name, amount
        )));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative_rate(rate: Rate) -> Result<()> {
    if rate.is_negative() {
        return Err(AmortizationError::invalid(format!(
            "interest rate must not be negative, got {}",
            rate
        )));
    }
    Ok(())
}
