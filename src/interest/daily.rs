use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::interest::{ensure_non_negative, ensure_non_negative_rate, DailyInterest, InterestCalculation};

/// days in the year the annual rate is spread over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DayCountBasis {
    /// actual days / 365
    #[default]
    Actual365,
    /// actual days / 360
    Actual360,
}

impl DayCountBasis {
    pub fn year_basis(&self) -> u32 {
        match self {
            DayCountBasis::Actual365 => 365,
            DayCountBasis::Actual360 => 360,
        }
    }
}

/// daily interest and accrual over a date range
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyInterestCalculator {
    pub basis: DayCountBasis,
}

impl DailyInterestCalculator {
    pub fn new(basis: DayCountBasis) -> Self {
        Self { basis }
    }

    /// number of days from start to end, both included
    pub fn inclusive_days(start_date: NaiveDate, end_date: NaiveDate) -> Result<u32> {
        if end_date < start_date {
            return Err(AmortizationError::invalid(format!(
                "end date {} is before start date {}",
                end_date, start_date
            )));
        }
        let days = (end_date - start_date).num_days() + 1;
        u32::try_from(days).map_err(|_| AmortizationError::invalid(format!("date range of {} days is too long", days)))
    }

    /// accrual with the daily rate and day count that produced it
    pub fn accrual_breakdown(
        &self,
        balance: Money,
        annual_rate: Rate,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<InterestCalculation> {
        ensure_non_negative("balance", balance)?;
        ensure_non_negative_rate(annual_rate)?;
        let days = Self::inclusive_days(start_date, end_date)?;

        let daily_rate = annual_rate.per_period(self.basis.year_basis());
        let interest = balance * (daily_rate.as_decimal() * Decimal::from(days));

        Ok(InterestCalculation {
            interest_amount: interest.round_currency(),
            daily_rate,
            days,
            principal_base: balance,
            calculation_method: format!("{:?}", self.basis),
        })
    }
}

impl DailyInterest for DailyInterestCalculator {
    fn calculate_daily(&self, balance: Money, annual_rate: Rate) -> Result<Money> {
        ensure_non_negative("balance", balance)?;
        ensure_non_negative_rate(annual_rate)?;

        let daily_rate = annual_rate.per_period(self.basis.year_basis());
        Ok((balance * daily_rate.as_decimal()).round_currency())
    }

    fn calculate_accrual(
        &self,
        balance: Money,
        annual_rate: Rate,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Money> {
        Ok(self
            .accrual_breakdown(balance, annual_rate, start_date, end_date)?
            .interest_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_interest() {
        let calc = DailyInterestCalculator::default();
        let daily = calc
            .calculate_daily(Money::from_major(10_000), Rate::from_percentage(5))
            .unwrap();
        assert_eq!(daily, Money::from_str_exact("1.37").unwrap());

        let daily_360 = DailyInterestCalculator::new(DayCountBasis::Actual360)
            .calculate_daily(Money::from_major(36_000), Rate::from_percentage(10))
            .unwrap();
        assert_eq!(daily_360, Money::from_major(10));
    }

    #[test]
    fn test_accrual_counts_both_ends() {
        let calc = DailyInterestCalculator::default();
        let accrual = calc
            .calculate_accrual(Money::from_major(36_500), Rate::from_percentage(10), date(2025, 1, 1), date(2025, 1, 10))
            .unwrap();
        assert_eq!(accrual, Money::from_major(100));

        let same_day = calc
            .accrual_breakdown(Money::from_major(36_500), Rate::from_percentage(10), date(2025, 3, 1), date(2025, 3, 1))
            .unwrap();
        assert_eq!(same_day.days, 1);
        assert_eq!(same_day.interest_amount, Money::from_major(10));
    }

    #[test]
    fn test_full_year_accrual() {
        let accrual = DailyInterestCalculator::default()
            .calculate_accrual(Money::from_major(10_000), Rate::from_percentage(5), date(2025, 1, 1), date(2025, 12, 31))
            .unwrap();
        assert_eq!(accrual, Money::from_major(500));
    }

    #[test]
    fn test_rejects_reversed_dates() {
        let result = DailyInterestCalculator::default().calculate_accrual(
            Money::from_major(1_000),
            Rate::from_percentage(5),
            date(2025, 2, 1),
            date(2025, 1, 31),
        );
        assert!(matches!(result, Err(AmortizationError::InvalidArgument { .. })));
    }
}
