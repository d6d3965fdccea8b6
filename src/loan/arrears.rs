use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{AmortizationError, Result};
use crate::types::LoanId;

/// how a payment against arrears was split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArrearsApplication {
    pub to_penalty: Money,
    pub to_interest: Money,
    pub to_principal: Money,
    /// part of the payment left over once every component is cleared
    pub remaining: Money,
}

impl ArrearsApplication {
    pub fn total_applied(&self) -> Money {
        self.to_penalty + self.to_interest + self.to_principal
    }
}

/// overdue ledger, paid down penalty first, then interest, then principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrears {
    id: Uuid,
    loan_id: Option<LoanId>,
    principal_amount: Money,
    interest_amount: Money,
    penalty_amount: Money,
    days_overdue: u32,
    total_amount: Money,
}

impl Arrears {
    pub fn new(
        loan_id: Option<LoanId>,
        principal_amount: Money,
        interest_amount: Money,
        days_overdue: u32,
    ) -> Result<Self> {
        ensure_non_negative("principal arrears", principal_amount)?;
        ensure_non_negative("interest arrears", interest_amount)?;

        let mut arrears = Self {
            id: Uuid::new_v4(),
            loan_id,
            principal_amount: principal_amount.round_currency(),
            interest_amount: interest_amount.round_currency(),
            penalty_amount: Money::ZERO,
            days_overdue,
            total_amount: Money::ZERO,
        };
        arrears.recompute_total();
        Ok(arrears)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loan_id(&self) -> Option<LoanId> {
        self.loan_id
    }

    pub fn principal_amount(&self) -> Money {
        self.principal_amount
    }

    pub fn interest_amount(&self) -> Money {
        self.interest_amount
    }

    pub fn penalty_amount(&self) -> Money {
        self.penalty_amount
    }

    pub fn days_overdue(&self) -> u32 {
        self.days_overdue
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// apply a payment in priority order: penalty, interest, principal
    pub fn apply_payment(&mut self, amount: Money) -> Result<ArrearsApplication> {
        ensure_non_negative("arrears payment", amount)?;

        let mut remaining = amount.round_currency();
        let mut application = ArrearsApplication::default();

        for (balance, applied) in [
            (&mut self.penalty_amount, &mut application.to_penalty),
            (&mut self.interest_amount, &mut application.to_interest),
            (&mut self.principal_amount, &mut application.to_principal),
        ] {
            let payment = remaining.min(*balance);
            *balance -= payment;
            *applied = payment;
            remaining -= payment;
        }

        application.remaining = remaining;
        self.recompute_total();
        Ok(application)
    }

    pub fn add_penalty(&mut self, amount: Money) -> Result<()> {
        ensure_non_negative("penalty", amount)?;
        self.penalty_amount = (self.penalty_amount + amount).round_currency();
        self.recompute_total();
        Ok(())
    }

    /// fold a further principal shortfall into this record
    pub fn add_shortfall(&mut self, principal: Money, additional_days: u32) -> Result<()> {
        ensure_non_negative("shortfall", principal)?;
        self.principal_amount = (self.principal_amount + principal).round_currency();
        self.days_overdue = self.days_overdue.saturating_add(additional_days);
        self.recompute_total();
        Ok(())
    }

    pub fn is_cleared(&self, tolerance: Money) -> bool {
        self.total_amount.is_negligible(tolerance)
    }

    pub(crate) fn attach_to(&mut self, loan_id: LoanId) {
        if self.loan_id.is_none() {
            self.loan_id = Some(loan_id);
        }
    }

    fn recompute_total(&mut self) {
        self.total_amount = (self.principal_amount + self.interest_amount + self.penalty_amount)
            .round_currency()
            .non_negative();
    }
}

fn ensure_non_negative(name: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(AmortizationError::invalid(format!(
            "{} must not be negative, got {}",
            name, amount
        )));
    }
    Ok(())
}
