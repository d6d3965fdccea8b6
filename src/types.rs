use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{AmortizationError, Result};

/// unique identifier for a loan
pub type LoanId = Uuid;

/// payment (and interest calculation) frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    SemiAnnual,
    Annual,
}

impl PaymentFrequency {
    /// number of periods in one year
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PaymentFrequency::Daily => 365,
            PaymentFrequency::Weekly => 52,
            PaymentFrequency::Biweekly => 26,
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::SemiAnnual => 2,
            PaymentFrequency::Annual => 1,
        }
    }

    /// calendar days between two payments, round(365 / periods per year)
    pub fn payment_interval_days(&self) -> u32 {
        let periods = self.periods_per_year();
        // integer half-up of 365 / periods
        (365 * 2 + periods) / (2 * periods)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFrequency::Daily => "daily",
            PaymentFrequency::Weekly => "weekly",
            PaymentFrequency::Biweekly => "biweekly",
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::SemiAnnual => "semiannual",
            PaymentFrequency::Annual => "annual",
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentFrequency {
    type Err = AmortizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(PaymentFrequency::Daily),
            "weekly" => Ok(PaymentFrequency::Weekly),
            "biweekly" => Ok(PaymentFrequency::Biweekly),
            "monthly" => Ok(PaymentFrequency::Monthly),
            "semiannual" => Ok(PaymentFrequency::SemiAnnual),
            "annual" => Ok(PaymentFrequency::Annual),
            other => Err(AmortizationError::invalid(format!(
                "unrecognized payment frequency '{}'",
                other
            ))),
        }
    }
}

/// what an extra payment buys the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPaymentStrategy {
    /// keep the installment, finish earlier
    #[default]
    ReduceTerm,
    /// keep the term, lower the installment
    ReducePayment,
}

/// how interest is treated while a payment holiday runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestHandling {
    /// interest is added to the balance as it accrues
    Accrual,
    /// interest is capitalized and the term is extended by the holiday length
    Deferral,
}

impl FromStr for InterestHandling {
    type Err = AmortizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accrual" => Ok(InterestHandling::Accrual),
            "deferral" => Ok(InterestHandling::Deferral),
            other => Err(AmortizationError::invalid(format!(
                "unrecognized interest handling '{}'",
                other
            ))),
        }
    }
}
