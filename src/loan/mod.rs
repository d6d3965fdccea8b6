pub mod arrears;
pub mod rate_period;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::payments::ScheduleRow;
use crate::types::{LoanId, PaymentFrequency};

pub use arrears::{Arrears, ArrearsApplication};
pub use rate_period::RatePeriod;

/// loan aggregate root
///
/// Event handlers mutate a loan only through the methods below, which keep the balance
/// non-negative, the term positive and `updated_at` current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    id: Option<LoanId>,
    principal: Money,
    annual_rate: Rate,
    months: u32,
    start_date: NaiveDate,
    payment_frequency: PaymentFrequency,
    interest_frequency: Option<PaymentFrequency>,
    current_balance: Money,
    payments_made: u32,
    balloon_amount: Option<Money>,
    rate_periods: Vec<RatePeriod>,
    arrears: Vec<Arrears>,
    schedule: Vec<ScheduleRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending_recalculation: Option<NaiveDate>,
}

impl Loan {
    /// create a monthly loan; see [`LoanBuilder`] for the other options
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        months: u32,
        start_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(AmortizationError::invalid(format!(
                "principal must be positive, got {}",
                principal
            )));
        }
        if !annual_rate.is_unit_interval() {
            return Err(AmortizationError::invalid(format!(
                "annual rate must be between 0 and 1, got {}",
                annual_rate.as_decimal()
            )));
        }
        if months == 0 {
            return Err(AmortizationError::invalid("loan term must be at least one payment"));
        }

        let principal = principal.round_currency();
        Ok(Self {
            id: None,
            principal,
            annual_rate,
            months,
            start_date,
            payment_frequency: PaymentFrequency::Monthly,
            interest_frequency: None,
            current_balance: principal,
            payments_made: 0,
            balloon_amount: None,
            rate_periods: Vec::new(),
            arrears: Vec::new(),
            schedule: Vec::new(),
            created_at: now,
            updated_at: now,
            pending_recalculation: None,
        })
    }

    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn id(&self) -> Option<LoanId> {
        self.id
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_rate(&self) -> Rate {
        self.annual_rate
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn payment_frequency(&self) -> PaymentFrequency {
        self.payment_frequency
    }

    pub fn interest_frequency(&self) -> Option<PaymentFrequency> {
        self.interest_frequency
    }

    pub fn current_balance(&self) -> Money {
        self.current_balance
    }

    pub fn payments_made(&self) -> u32 {
        self.payments_made
    }

    pub fn balloon_amount(&self) -> Option<Money> {
        self.balloon_amount
    }

    pub fn rate_periods(&self) -> &[RatePeriod] {
        &self.rate_periods
    }

    pub fn arrears(&self) -> &[Arrears] {
        &self.arrears
    }

    pub fn schedule(&self) -> &[ScheduleRow] {
        &self.schedule
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// payments still owed under the current term
    pub fn remaining_payments(&self) -> u32 {
        self.months.saturating_sub(self.payments_made)
    }

    pub fn is_paid_off(&self) -> bool {
        self.current_balance.is_negligible(Money::CENT)
    }

    /// rate in force on `date`: the active rate period that started last, else the base rate
    pub fn effective_rate(&self, date: NaiveDate) -> Rate {
        self.rate_periods
            .iter()
            .filter(|period| period.is_active(date))
            .max_by_key(|period| period.start_date())
            .map(|period| period.rate())
            .unwrap_or(self.annual_rate)
    }

    /// arrears records not yet cleared, oldest first
    pub fn active_arrears(&self, tolerance: Money) -> impl Iterator<Item = &Arrears> {
        self.arrears.iter().filter(move |a| !a.is_cleared(tolerance))
    }

    pub fn total_arrears(&self, tolerance: Money) -> Money {
        self.active_arrears(tolerance).map(|a| a.total_amount()).sum()
    }

    /// scheduled payment due on `date`, falling back to the first row's payment
    pub fn regular_payment_for(&self, date: NaiveDate) -> Result<Money> {
        self.schedule
            .iter()
            .find(|row| row.payment_date == date)
            .or_else(|| self.schedule.first())
            .map(|row| row.payment_amount)
            .ok_or_else(|| AmortizationError::runtime("loan has no schedule rows to derive a regular payment from"))
    }

    /// persistence hook, also claims rate periods and arrears created before the loan had an id
    pub fn assign_id(&mut self, id: LoanId) -> Result<()> {
        if let Some(existing) = self.id {
            if existing != id {
                return Err(AmortizationError::logic(format!(
                    "loan already has id {}, cannot reassign to {}",
                    existing, id
                )));
            }
        }
        self.id = Some(id);
        for period in &mut self.rate_periods {
            period.attach_to(id);
        }
        for arrears in &mut self.arrears {
            arrears.attach_to(id);
        }
        Ok(())
    }

    pub fn set_months(&mut self, months: u32, now: DateTime<Utc>) -> Result<()> {
        if months == 0 {
            return Err(AmortizationError::invalid("loan term must be at least one payment"));
        }
        self.months = months;
        self.touch(now);
        Ok(())
    }

    pub fn extend_term(&mut self, additional: u32, now: DateTime<Utc>) -> Result<()> {
        let months = self
            .months
            .checked_add(additional)
            .ok_or_else(|| AmortizationError::invalid(format!("cannot extend term by {}", additional)))?;
        self.set_months(months, now)
    }

    pub fn increase_balance(&mut self, amount: Money, now: DateTime<Utc>) -> Result<()> {
        if amount.is_negative() {
            return Err(AmortizationError::invalid(format!(
                "balance increase must not be negative, got {}",
                amount
            )));
        }
        self.current_balance = (self.current_balance + amount).round_currency();
        self.touch(now);
        Ok(())
    }

    /// reduce the balance, clamping at zero; returns the amount actually taken off
    pub fn reduce_balance(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money> {
        if amount.is_negative() {
            return Err(AmortizationError::invalid(format!(
                "balance reduction must not be negative, got {}",
                amount
            )));
        }
        let applied = amount.round_currency().min(self.current_balance);
        self.current_balance = (self.current_balance - applied).non_negative();
        self.touch(now);
        Ok(applied)
    }

    pub fn add_rate_period(&mut self, period: RatePeriod, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owned("rate period", period.loan_id())?;
        self.rate_periods.push(period);
        self.touch(now);
        Ok(())
    }

    pub fn add_arrears(&mut self, arrears: Arrears, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owned("arrears", arrears.loan_id())?;
        self.arrears.push(arrears);
        self.touch(now);
        Ok(())
    }

    /// oldest arrears record still outstanding
    pub fn first_active_arrears_mut(&mut self, tolerance: Money) -> Option<&mut Arrears> {
        self.arrears.iter_mut().find(|a| !a.is_cleared(tolerance))
    }

    pub(crate) fn active_arrears_mut(&mut self, tolerance: Money) -> impl Iterator<Item = &mut Arrears> {
        self.arrears.iter_mut().filter(move |a| !a.is_cleared(tolerance))
    }

    pub fn replace_schedule(&mut self, schedule: Vec<ScheduleRow>, now: DateTime<Utc>) {
        self.schedule = schedule;
        self.touch(now);
    }

    /// settle the next scheduled row if it is due by `as_of`
    pub fn record_scheduled_payment(&mut self, as_of: NaiveDate, now: DateTime<Utc>) -> Result<ScheduleRow> {
        let next_number = self.payments_made + 1;
        let row = self
            .schedule
            .iter()
            .find(|row| row.payment_number == next_number)
            .cloned()
            .ok_or_else(|| AmortizationError::runtime(format!("no schedule row for payment {}", next_number)))?;

        if row.payment_date > as_of {
            return Err(AmortizationError::logic(format!(
                "payment {} is not due until {}",
                row.payment_number, row.payment_date
            )));
        }

        self.current_balance = (self.current_balance - row.principal_amount).non_negative();
        self.payments_made = next_number;
        self.touch(now);
        Ok(row)
    }

    /// ask for the schedule to be rebuilt from `from_date`; the earliest request wins
    pub fn request_recalculation(&mut self, from_date: NaiveDate) {
        self.pending_recalculation = Some(match self.pending_recalculation {
            Some(existing) => existing.min(from_date),
            None => from_date,
        });
    }

    pub fn pending_recalculation(&self) -> Option<NaiveDate> {
        self.pending_recalculation
    }

    pub fn take_recalculation(&mut self) -> Option<NaiveDate> {
        self.pending_recalculation.take()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn ensure_owned(&self, what: &str, owner: Option<LoanId>) -> Result<()> {
        if let (Some(loan_id), Some(owner)) = (self.id, owner) {
            if loan_id != owner {
                return Err(AmortizationError::invalid(format!(
                    "{} belongs to loan {}, not {}",
                    what, owner, loan_id
                )));
            }
        }
        if self.id.is_some() && owner.is_none() {
            return Err(AmortizationError::invalid(format!(
                "{} must reference loan {}",
                what,
                self.id.map(|id| id.to_string()).unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// builder for loans
#[derive(Debug, Clone, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    principal: Option<Money>,
    annual_rate: Option<Rate>,
    months: Option<u32>,
    start_date: Option<NaiveDate>,
    payment_frequency: Option<PaymentFrequency>,
    interest_frequency: Option<PaymentFrequency>,
    balloon_amount: Option<Money>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn annual_rate(mut self, rate: Rate) -> Self {
        self.annual_rate = Some(rate);
        self
    }

    pub fn months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.payment_frequency = Some(frequency);
        self
    }

    pub fn interest_frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.interest_frequency = Some(frequency);
        self
    }

    pub fn balloon(mut self, amount: Money) -> Self {
        self.balloon_amount = Some(amount);
        self
    }

    /// build the loan, starting today unless a start date was set
    pub fn build(self, time_provider: &SafeTimeProvider) -> Result<Loan> {
        let now = time_provider.now();
        let principal = self
            .principal
            .ok_or_else(|| AmortizationError::invalid("principal is required"))?;
        let annual_rate = self
            .annual_rate
            .ok_or_else(|| AmortizationError::invalid("annual rate is required"))?;
        let months = self
            .months
            .ok_or_else(|| AmortizationError::invalid("term is required"))?;
        let start_date = self.start_date.unwrap_or_else(|| now.date_naive());

        let mut loan = Loan::new(principal, annual_rate, months, start_date, now)?;

        if let Some(balloon) = self.balloon_amount {
            if balloon.is_negative() || balloon >= loan.principal {
                return Err(AmortizationError::invalid(format!(
                    "balloon {} must be at least zero and below principal {}",
                    balloon, loan.principal
                )));
            }
            loan.balloon_amount = Some(balloon.round_currency());
        }
        if let Some(frequency) = self.payment_frequency {
            loan.payment_frequency = frequency;
        }
        loan.interest_frequency = self.interest_frequency;
        loan.id = self.id;

        Ok(loan)
    }
}
