use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{AmortizationError, Result};
use crate::types::LoanId;

/// time-bounded override of a loan's base rate, both ends inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePeriod {
    loan_id: Option<LoanId>,
    rate: Rate,
    start_date: NaiveDate,
    /// open-ended when absent
    end_date: Option<NaiveDate>,
}

impl RatePeriod {
    pub fn new(
        loan_id: Option<LoanId>,
        rate: Rate,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self> {
        if !rate.is_unit_interval() {
            return Err(AmortizationError::invalid(format!(
                "rate period rate must be between 0 and 1, got {}",
                rate.as_decimal()
            )));
        }
        if let Some(end) = end_date {
            if end < start_date {
                return Err(AmortizationError::invalid(format!(
                    "rate period ends {} before it starts {}",
                    end, start_date
                )));
            }
        }

        Ok(Self {
            loan_id,
            rate,
            start_date,
            end_date,
        })
    }

    pub fn loan_id(&self) -> Option<LoanId> {
        self.loan_id
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn is_active(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    pub(crate) fn attach_to(&mut self, loan_id: LoanId) {
        if self.loan_id.is_none() {
            self.loan_id = Some(loan_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bounded_period() {
        let period = RatePeriod::new(None, Rate::from_percentage(7), date(2025, 3, 1), Some(date(2025, 5, 31))).unwrap();

        assert!(!period.is_active(date(2025, 2, 28)));
        assert!(period.is_active(date(2025, 3, 1)));
        assert!(period.is_active(date(2025, 5, 31)));
        assert!(!period.is_active(date(2025, 6, 1)));
    }

    #[test]
    fn test_open_ended_period() {
        let period = RatePeriod::new(None, Rate::from_percentage(4), date(2025, 1, 1), None).unwrap();
        assert!(period.is_active(date(2040, 1, 1)));
    }

    #[test]
    fn test_validation() {
        assert!(RatePeriod::new(None, Rate::from_decimal(dec!(1.5)), date(2025, 1, 1), None).is_err());
        assert!(RatePeriod::new(None, Rate::from_decimal(dec!(-0.01)), date(2025, 1, 1), None).is_err());
        assert!(RatePeriod::new(None, Rate::from_percentage(5), date(2025, 2, 1), Some(date(2025, 1, 1))).is_err());
        assert!(RatePeriod::new(None, Rate::from_percentage(5), date(2025, 2, 1), Some(date(2025, 2, 1))).is_ok());
    }
}
