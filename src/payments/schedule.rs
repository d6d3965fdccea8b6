use chrono::{Days, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::interest::{PeriodicInterest, PeriodicInterestCalculator};
use crate::loan::Loan;
use crate::payments::PaymentCalculator;
use crate::types::PaymentFrequency;

/// one period of an amortization schedule, all amounts in cents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub payment_amount: Money,
    pub interest_amount: Money,
    pub principal_amount: Money,
    pub remaining_balance: Money,
}

/// inputs for one schedule generation
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub principal: Money,
    pub annual_rate: Rate,
    pub frequency: PaymentFrequency,
    pub number_of_payments: u32,
    /// defaults to today
    pub start_date: Option<NaiveDate>,
    /// defaults to the payment frequency
    pub interest_frequency: Option<PaymentFrequency>,
    pub balloon: Option<Money>,
}

impl ScheduleRequest {
    pub fn new(principal: Money, annual_rate: Rate, frequency: PaymentFrequency, number_of_payments: u32) -> Self {
        Self {
            principal,
            annual_rate,
            frequency,
            number_of_payments,
            start_date: None,
            interest_frequency: None,
            balloon: None,
        }
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn interest_frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.interest_frequency = Some(frequency);
        self
    }

    pub fn balloon(mut self, balloon: Money) -> Self {
        self.balloon = Some(balloon);
        self
    }
}

/// totals over a run of schedule rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub payment_count: u32,
    pub total_payments: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    pub final_payment_date: Option<NaiveDate>,
}

impl ScheduleSummary {
    pub fn from_rows(rows: &[ScheduleRow]) -> Self {
        Self {
            payment_count: rows.len() as u32,
            total_payments: rows.iter().map(|r| r.payment_amount).sum(),
            total_interest: rows.iter().map(|r| r.interest_amount).sum(),
            total_principal: rows.iter().map(|r| r.principal_amount).sum(),
            final_payment_date: rows.last().map(|r| r.payment_date),
        }
    }
}

/// builds amortization schedules period by period
///
/// Each period's interest depends on the previous period's ending balance, so rows are produced
/// strictly in order. Generation is pure: the same request always yields the same rows.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator<I = PeriodicInterestCalculator> {
    payments: PaymentCalculator,
    interest: I,
}

impl ScheduleGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I: PeriodicInterest> ScheduleGenerator<I> {
    pub fn with_interest(payments: PaymentCalculator, interest: I) -> Self {
        Self { payments, interest }
    }

    /// positional form of [`ScheduleGenerator::generate`]
    #[allow(clippy::too_many_arguments)]
    pub fn generate_schedule(
        &self,
        principal: Money,
        annual_rate: Rate,
        frequency: PaymentFrequency,
        number_of_payments: u32,
        start_date: Option<NaiveDate>,
        interest_frequency: Option<PaymentFrequency>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<ScheduleRow>> {
        let request = ScheduleRequest {
            principal,
            annual_rate,
            frequency,
            number_of_payments,
            start_date,
            interest_frequency,
            balloon: None,
        };
        self.generate(&request, time_provider)
    }

    /// generate the full schedule for a request
    pub fn generate(&self, request: &ScheduleRequest, time_provider: &SafeTimeProvider) -> Result<Vec<ScheduleRow>> {
        let start_date = request
            .start_date
            .unwrap_or_else(|| time_provider.now().date_naive());
        self.build_rows(request, start_date)
    }

    /// regenerate every unpaid row dated on or after `from_date` from the loan's current state
    pub fn regenerate_from(&self, loan: &Loan, from_date: NaiveDate) -> Result<Vec<ScheduleRow>> {
        self.regenerate(loan, from_date, None)
    }

    /// keep paid rows and rows dated before `keep_before`, rebuild the rest from the loan's
    /// current balance, rate and term
    ///
    /// The rebuilt tail starts on `resume_on` if given, else on the date of the first replaced
    /// row, else one interval after the last kept row. Numbering continues after the kept rows.
    pub fn regenerate(
        &self,
        loan: &Loan,
        keep_before: NaiveDate,
        resume_on: Option<NaiveDate>,
    ) -> Result<Vec<ScheduleRow>> {
        let paid = loan.payments_made();
        let mut rows: Vec<ScheduleRow> = loan
            .schedule()
            .iter()
            .take_while(|row| row.payment_number <= paid || row.payment_date < keep_before)
            .cloned()
            .collect();
        let kept = rows.len() as u32;

        let balance = loan.current_balance().round_currency();
        if !balance.is_positive() {
            debug!(kept, "loan balance is settled, nothing to regenerate");
            return Ok(rows);
        }

        let tail_start = match resume_on {
            Some(date) => date,
            None => match loan.schedule().get(rows.len()) {
                Some(row) => row.payment_date,
                None => after_last_row(&rows, keep_before, loan.payment_frequency())?,
            },
        };
        let remaining = loan.months().saturating_sub(kept).max(1);

        let mut request = ScheduleRequest::new(balance, loan.effective_rate(tail_start), loan.payment_frequency(), remaining)
            .starting(tail_start);
        if let Some(frequency) = loan.interest_frequency() {
            request = request.interest_frequency(frequency);
        }
        if let Some(balloon) = loan.balloon_amount().filter(|b| b.is_positive() && *b < balance) {
            request = request.balloon(balloon);
        }

        let tail = self.build_rows(&request, tail_start)?;
        debug!(
            kept,
            regenerated = tail.len(),
            %tail_start,
            "regenerated schedule tail"
        );

        rows.extend(tail.into_iter().map(|mut row| {
            row.payment_number += kept;
            row
        }));
        Ok(rows)
    }

    fn build_rows(&self, request: &ScheduleRequest, start_date: NaiveDate) -> Result<Vec<ScheduleRow>> {
        let balloon = request.balloon.unwrap_or(Money::ZERO);
        let payment = self.payments.calculate_with_balloon(
            request.principal,
            request.annual_rate,
            request.frequency,
            request.number_of_payments,
            balloon,
        )?;

        let interest_frequency = request.interest_frequency.unwrap_or(request.frequency);
        let step = Days::new(u64::from(request.frequency.payment_interval_days()));

        let mut rows = Vec::with_capacity(request.number_of_payments as usize);
        let mut balance = request.principal.round_currency();
        let mut payment_date = start_date;

        for payment_number in 1..=request.number_of_payments {
            let interest = self
                .interest
                .calculate(balance, request.annual_rate, interest_frequency)?;

            let is_last = payment_number == request.number_of_payments;
            let scheduled_principal = payment - interest;

            // the last row always retires whatever is left, earlier rows never overshoot the balance
            let (payment_amount, principal_amount) = if is_last || scheduled_principal > balance {
                (balance + interest, balance)
            } else {
                (payment, scheduled_principal)
            };

            let remaining_balance = (balance - principal_amount).non_negative();

            rows.push(ScheduleRow {
                payment_number,
                payment_date,
                payment_amount: payment_amount.round_currency(),
                interest_amount: interest.round_currency(),
                principal_amount: principal_amount.round_currency(),
                remaining_balance: remaining_balance.round_currency(),
            });

            balance = remaining_balance;
            payment_date = payment_date.checked_add_days(step).ok_or_else(|| {
                AmortizationError::runtime(format!("payment date overflow after {}", payment_date))
            })?;
        }

        Ok(rows)
    }
}

fn after_last_row(rows: &[ScheduleRow], keep_before: NaiveDate, frequency: PaymentFrequency) -> Result<NaiveDate> {
    let Some(last) = rows.last() else {
        return Ok(keep_before);
    };
    let next = last
        .payment_date
        .checked_add_days(Days::new(u64::from(frequency.payment_interval_days())))
        .ok_or_else(|| AmortizationError::runtime(format!("payment date overflow after {}", last.payment_date)))?;
    Ok(next.max(keep_before))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()))
    }

    fn assert_schedule_invariants(rows: &[ScheduleRow], principal: Money) {
        let mut previous = principal.round_currency();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.payment_number, i as u32 + 1);
            assert_eq!(row.interest_amount + row.principal_amount, row.payment_amount);
            assert_eq!(row.remaining_balance, previous - row.principal_amount);
            previous = row.remaining_balance;
        }
        assert_eq!(rows.last().unwrap().remaining_balance, Money::ZERO);
    }

    #[test]
    fn test_sixty_month_schedule() {
        let principal = Money::from_major(10_000);
        let rows = ScheduleGenerator::new()
            .generate_schedule(
                principal,
                Rate::from_percent(dec!(5.0)),
                PaymentFrequency::Monthly,
                60,
                Some(date(2025, 1, 1)),
                None,
                &test_time(),
            )
            .unwrap();

        assert_eq!(rows.len(), 60);
        assert_schedule_invariants(&rows, principal);

        let first = &rows[0];
        assert_eq!(first.payment_date, date(2025, 1, 1));
        assert_eq!(first.payment_amount, Money::from_str_exact("188.71").unwrap());
        assert_eq!(first.interest_amount, Money::from_str_exact("41.67").unwrap());
        assert_eq!(first.principal_amount, Money::from_str_exact("147.04").unwrap());
        assert_eq!(first.remaining_balance, Money::from_str_exact("9852.96").unwrap());
        assert_eq!(rows[1].payment_date, date(2025, 1, 31));
    }

    #[test]
    fn test_regeneration_keeps_paid_rows() {
        let time = test_time();
        let generator = ScheduleGenerator::new();
        let mut loan = Loan::builder()
            .id(uuid::Uuid::new_v4())
            .principal(Money::from_major(10_000))
            .annual_rate(Rate::from_percent(dec!(5.0)))
            .months(60)
            .start_date(date(2025, 1, 1))
            .build(&time)
            .unwrap();
        loan.replace_schedule(generator.regenerate_from(&loan, loan.start_date()).unwrap(), time.now());
        let paid = loan.record_scheduled_payment(date(2025, 1, 1), time.now()).unwrap();
        loan.reduce_balance(Money::from_major(2_000), time.now()).unwrap();

        // rebuilding from the paid row's own date must leave it alone
        let rows = generator.regenerate_from(&loan, date(2025, 1, 1)).unwrap();

        assert_eq!(rows.len(), 60);
        assert_eq!(rows[0], paid);
        assert_eq!(rows[1].payment_number, 2);
        assert_eq!(rows[1].payment_date, date(2025, 1, 31));

        let mut previous = loan.current_balance();
        for row in &rows[1..] {
            assert_eq!(row.remaining_balance, previous - row.principal_amount);
            previous = row.remaining_balance;
        }
        assert_eq!(previous, Money::ZERO);
    }

    #[test]
    fn test_regeneration_after_last_row_continues_dates() {
        let time = test_time();
        let generator = ScheduleGenerator::new();
        let mut loan = Loan::builder()
            .id(uuid::Uuid::new_v4())
            .principal(Money::from_major(1_200))
            .annual_rate(Rate::from_percentage(6))
            .months(2)
            .start_date(date(2025, 1, 1))
            .build(&time)
            .unwrap();
        loan.replace_schedule(generator.regenerate_from(&loan, loan.start_date()).unwrap(), time.now());
        loan.record_scheduled_payment(date(2025, 1, 1), time.now()).unwrap();
        loan.record_scheduled_payment(date(2025, 1, 31), time.now()).unwrap();
        loan.increase_balance(Money::from_major(100), time.now()).unwrap();
        loan.extend_term(1, time.now()).unwrap();

        let rows = generator.regenerate_from(&loan, date(2025, 1, 15)).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].payment_number, 3);
        assert_eq!(rows[2].payment_date, date(2025, 3, 2));
        assert_eq!(rows[2].principal_amount, Money::from_major(100));
    }

    #[test]
    fn test_default_start_is_today() {
        let rows = ScheduleGenerator::new()
            .generate(
                &ScheduleRequest::new(Money::from_major(1_000), Rate::from_percentage(6), PaymentFrequency::Weekly, 4),
                &test_time(),
            )
            .unwrap();
        assert_eq!(rows[0].payment_date, date(2025, 1, 1));
        assert_eq!(rows[3].payment_date, date(2025, 1, 22));
    }

    #[test]
    fn test_zero_rate_schedule() {
        let principal = Money::from_major(100);
        let rows = ScheduleGenerator::new()
            .generate(
                &ScheduleRequest::new(principal, Rate::ZERO, PaymentFrequency::Monthly, 3).starting(date(2025, 1, 1)),
                &test_time(),
            )
            .unwrap();

        assert!(rows.iter().all(|r| r.interest_amount == Money::ZERO));
        assert_eq!(rows[0].payment_amount, Money::from_str_exact("33.33").unwrap());
        assert_eq!(rows[2].payment_amount, Money::from_str_exact("33.34").unwrap());
        assert_schedule_invariants(&rows, principal);
    }

    #[test]
    fn test_tiny_loan_never_overshoots() {
        let principal = Money::from_major(1);
        let rows = ScheduleGenerator::new()
            .generate(
                &ScheduleRequest::new(principal, Rate::from_percentage(5), PaymentFrequency::Monthly, 360)
                    .starting(date(2025, 1, 1)),
                &test_time(),
            )
            .unwrap();
        assert_eq!(rows.len(), 360);
        assert_schedule_invariants(&rows, principal);
    }

    #[test]
    fn test_balloon_schedule_sweeps_remainder() {
        let principal = Money::from_major(50_000);
        let rows = ScheduleGenerator::new()
            .generate(
                &ScheduleRequest::new(principal, Rate::from_percentage(6), PaymentFrequency::Monthly, 60)
                    .starting(date(2025, 1, 1))
                    .balloon(Money::from_major(20_000)),
                &test_time(),
            )
            .unwrap();

        let last = rows.last().unwrap();
        assert!(last.payment_amount > Money::from_major(20_000));
        assert!(last.payment_amount < Money::from_major(21_000));
        assert_schedule_invariants(&rows, principal);
    }

    #[test]
    fn test_interest_frequency_override() {
        let request = ScheduleRequest::new(Money::from_major(36_500), Rate::from_percentage(10), PaymentFrequency::Monthly, 12)
            .starting(date(2025, 1, 1))
            .interest_frequency(PaymentFrequency::Daily);
        let rows = ScheduleGenerator::new().generate(&request, &test_time()).unwrap();

        // one day of interest per period
        assert_eq!(rows[0].interest_amount, Money::from_major(10));
        assert_schedule_invariants(&rows, Money::from_major(36_500));
    }

    #[test]
    fn test_summary() {
        let rows = ScheduleGenerator::new()
            .generate(
                &ScheduleRequest::new(Money::from_major(12_000), Rate::ZERO, PaymentFrequency::Monthly, 12)
                    .starting(date(2025, 1, 1)),
                &test_time(),
            )
            .unwrap();
        let summary = ScheduleSummary::from_rows(&rows);

        assert_eq!(summary.payment_count, 12);
        assert_eq!(summary.total_payments, Money::from_major(12_000));
        assert_eq!(summary.total_principal, Money::from_major(12_000));
        assert_eq!(summary.total_interest, Money::ZERO);
        assert_eq!(summary.final_payment_date, Some(date(2025, 11, 27)));
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let generator = ScheduleGenerator::new();
        let time = test_time();
        assert!(matches!(
            generator.generate(&ScheduleRequest::new(Money::ZERO, Rate::ZERO, PaymentFrequency::Monthly, 12), &time),
            Err(AmortizationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            generator.generate(&ScheduleRequest::new(Money::from_major(1), Rate::ZERO, PaymentFrequency::Monthly, 0), &time),
            Err(AmortizationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            generator.generate(
                &ScheduleRequest::new(Money::from_major(1), Rate::from_decimal(dec!(-0.1)), PaymentFrequency::Monthly, 1),
                &time
            ),
            Err(AmortizationError::InvalidArgument { .. })
        ));
    }

    fn frequency_strategy() -> impl Strategy<Value = PaymentFrequency> {
        prop_oneof![
            Just(PaymentFrequency::Daily),
            Just(PaymentFrequency::Weekly),
            Just(PaymentFrequency::Biweekly),
            Just(PaymentFrequency::Monthly),
            Just(PaymentFrequency::SemiAnnual),
            Just(PaymentFrequency::Annual),
        ]
    }

    proptest! {
        #[test]
        fn schedule_terminates_at_zero(
            cents in 100i64..100_000_000i64,
            bps in 0u32..2_500u32,
            payments in 1u32..400u32,
            frequency in frequency_strategy(),
        ) {
            let principal = Money::from_minor(cents);
            let request = ScheduleRequest::new(principal, Rate::from_bps(bps), frequency, payments)
                .starting(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
            let rows = ScheduleGenerator::new().generate(&request, &test_time()).unwrap();

            prop_assert_eq!(rows.len() as u32, payments);
            let mut previous = principal;
            for (i, row) in rows.iter().enumerate() {
                prop_assert_eq!(row.payment_number, i as u32 + 1);
                prop_assert_eq!(row.interest_amount + row.principal_amount, row.payment_amount);
                prop_assert_eq!(row.remaining_balance, previous - row.principal_amount);
                previous = row.remaining_balance;
            }
            prop_assert_eq!(rows.last().unwrap().remaining_balance, Money::ZERO);
        }

        #[test]
        fn schedule_generation_is_idempotent(
            cents in 100i64..10_000_000i64,
            bps in 0u32..2_000u32,
            payments in 1u32..120u32,
        ) {
            let request = ScheduleRequest::new(Money::from_minor(cents), Rate::from_bps(bps), PaymentFrequency::Monthly, payments)
                .starting(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
            let generator = ScheduleGenerator::new();
            let time = test_time();
            prop_assert_eq!(generator.generate(&request, &time).unwrap(), generator.generate(&request, &time).unwrap());
        }
    }
}
