use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::HolidayPolicy;
use crate::decimal::Money;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::interest::{PeriodicInterest, PeriodicInterestCalculator};
use crate::loan::Loan;
use crate::payments::ScheduleGenerator;
use crate::types::{InterestHandling, LoanId, PaymentFrequency};

/// forbearance workflow, strictly forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayStatus {
    Pending,
    Approved,
    Active,
    Completed,
}

/// an agreed pause in repayments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHoliday {
    pub id: Uuid,
    pub loan_id: Option<LoanId>,
    pub months: u32,
    pub interest_handling: InterestHandling,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: HolidayStatus,
    /// interest added to the balance on activation
    pub interest_applied: Money,
}

/// runs payment holidays outside the generic dispatcher since they span several steps
#[derive(Debug, Clone, Default)]
pub struct PaymentHolidayHandler {
    policy: HolidayPolicy,
    interest: PeriodicInterestCalculator,
    generator: ScheduleGenerator,
}

impl PaymentHolidayHandler {
    pub fn new(policy: HolidayPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_generator(policy: HolidayPolicy, generator: ScheduleGenerator) -> Self {
        Self {
            policy,
            interest: PeriodicInterestCalculator::new(),
            generator,
        }
    }

    pub fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::PaymentHoliday { .. })
    }

    /// open a pending holiday
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &self,
        loan: &Loan,
        start_date: NaiveDate,
        months: u32,
        interest_handling: InterestHandling,
        reason: impl Into<String>,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<PaymentHoliday> {
        if months < 1 || months > self.policy.max_months {
            return Err(AmortizationError::invalid(format!(
                "holiday must last between 1 and {} months, got {}",
                self.policy.max_months, months
            )));
        }
        if months > loan.months() {
            return Err(AmortizationError::invalid(format!(
                "holiday of {} months exceeds the loan term of {}",
                months,
                loan.months()
            )));
        }
        let end_date = start_date
            .checked_add_months(Months::new(months))
            .ok_or_else(|| AmortizationError::invalid(format!("holiday end date overflows from {}", start_date)))?;

        let holiday = PaymentHoliday {
            id: Uuid::new_v4(),
            loan_id: loan.id(),
            months,
            interest_handling,
            reason: reason.into(),
            start_date,
            end_date,
            status: HolidayStatus::Pending,
            interest_applied: Money::ZERO,
        };

        info!(
            loan_id = ?holiday.loan_id,
            holiday_id = %holiday.id,
            months,
            ?interest_handling,
            "payment holiday requested"
        );
        audit.emit(AuditEvent::HolidayStatusChanged {
            loan_id: holiday.loan_id,
            holiday_id: holiday.id,
            old_status: None,
            new_status: HolidayStatus::Pending,
            timestamp: time_provider.now(),
        });
        Ok(holiday)
    }

    /// open a pending holiday from a payment holiday event
    pub fn request_from_event(
        &self,
        loan: &Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<PaymentHoliday> {
        let LoanEventKind::PaymentHoliday { months, interest_handling, ref reason } = event.kind else {
            return Err(AmortizationError::logic(format!(
                "payment holiday handler cannot handle {} events",
                event.event_type()
            )));
        };
        self.request(loan, event.event_date, months, interest_handling, reason.clone(), time_provider, audit)
    }

    pub fn approve(
        &self,
        holiday: &mut PaymentHoliday,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<()> {
        transition(holiday, HolidayStatus::Pending, HolidayStatus::Approved, time_provider, audit)
    }

    /// start the holiday: capitalize its interest and push the schedule past it
    pub fn activate(
        &self,
        loan: &mut Loan,
        holiday: &mut PaymentHoliday,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<Money> {
        ensure_status(holiday, HolidayStatus::Approved, HolidayStatus::Active)?;
        ensure_same_loan(loan, holiday)?;

        let interest = self.calculate_interest(loan, holiday)?;
        let months_added = match holiday.interest_handling {
            InterestHandling::Accrual => 0,
            InterestHandling::Deferral => holiday.months,
        };
        let new_months = loan
            .months()
            .checked_add(months_added)
            .ok_or_else(|| AmortizationError::invalid(format!("cannot extend term by {}", months_added)))?;

        let now = time_provider.now();
        loan.increase_balance(interest, now)?;
        loan.set_months(new_months, now)?;
        holiday.interest_applied = interest;

        self.recalculate_schedule(loan, holiday, time_provider)?;
        transition(holiday, HolidayStatus::Approved, HolidayStatus::Active, time_provider, audit)?;

        audit.emit(AuditEvent::HolidayInterestApplied {
            loan_id: loan.id(),
            holiday_id: holiday.id,
            interest_handling: holiday.interest_handling,
            interest,
            months_added,
            timestamp: now,
        });
        Ok(interest)
    }

    pub fn complete(
        &self,
        loan: &mut Loan,
        holiday: &mut PaymentHoliday,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<()> {
        ensure_same_loan(loan, holiday)?;
        transition(holiday, HolidayStatus::Active, HolidayStatus::Completed, time_provider, audit)?;
        loan.touch(time_provider.now());
        Ok(())
    }

    /// interest for the whole holiday: one month at the rate in force on the start date, times
    /// the holiday length
    pub fn calculate_interest(&self, loan: &Loan, holiday: &PaymentHoliday) -> Result<Money> {
        let monthly = self.interest.calculate(
            loan.current_balance(),
            loan.effective_rate(holiday.start_date),
            PaymentFrequency::Monthly,
        )?;
        Ok((monthly * Decimal::from(holiday.months)).round_currency())
    }

    /// keep rows before the holiday and resume repayments when it ends
    pub fn recalculate_schedule(
        &self,
        loan: &mut Loan,
        holiday: &PaymentHoliday,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let rows = self
            .generator
            .regenerate(loan, holiday.start_date, Some(holiday.end_date))?;
        loan.replace_schedule(rows, time_provider.now());
        Ok(())
    }
}

fn ensure_status(holiday: &PaymentHoliday, expected: HolidayStatus, target: HolidayStatus) -> Result<()> {
    if holiday.status != expected {
        return Err(AmortizationError::logic(format!(
            "holiday {} is {:?}, cannot move to {:?}",
            holiday.id, holiday.status, target
        )));
    }
    Ok(())
}

fn ensure_same_loan(loan: &Loan, holiday: &PaymentHoliday) -> Result<()> {
    if holiday.loan_id != loan.id() {
        return Err(AmortizationError::invalid(format!(
            "holiday {} does not belong to this loan",
            holiday.id
        )));
    }
    Ok(())
}

fn transition(
    holiday: &mut PaymentHoliday,
    from: HolidayStatus,
    to: HolidayStatus,
    time_provider: &SafeTimeProvider,
    audit: &mut AuditTrail,
) -> Result<()> {
    ensure_status(holiday, from, to)?;
    holiday.status = to;
    info!(loan_id = ?holiday.loan_id, holiday_id = %holiday.id, status = ?to, "payment holiday status changed");
    audit.emit(AuditEvent::HolidayStatusChanged {
        loan_id: holiday.loan_id,
        holiday_id: holiday.id,
        old_status: Some(from),
        new_status: to,
        timestamp: time_provider.now(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;

    fn approved(handler: &PaymentHolidayHandler, loan: &Loan, handling: InterestHandling) -> PaymentHoliday {
        let time = test_time();
        let mut audit = AuditTrail::new();
        let mut holiday = handler
            .request(loan, date(2025, 3, 2), 3, handling, "hardship", &time, &mut audit)
            .unwrap();
        handler.approve(&mut holiday, &time, &mut audit).unwrap();
        holiday
    }

    #[test]
    fn test_request_validation() {
        let handler = PaymentHolidayHandler::default();
        let loan = scheduled_loan(12_000, 6, 6);
        let time = test_time();
        let mut audit = AuditTrail::new();

        for months in [0, 7, 13] {
            assert!(matches!(
                handler.request(&loan, date(2025, 3, 1), months, InterestHandling::Accrual, "", &time, &mut audit),
                Err(AmortizationError::InvalidArgument { .. })
            ));
        }

        let holiday = handler
            .request(&loan, date(2025, 1, 31), 1, InterestHandling::Accrual, "", &time, &mut audit)
            .unwrap();
        assert_eq!(holiday.status, HolidayStatus::Pending);
        assert_eq!(holiday.end_date, date(2025, 2, 28));
    }

    #[test]
    fn test_accrual_adds_interest_only() {
        let handler = PaymentHolidayHandler::default();
        let mut loan = scheduled_loan(12_000, 6, 12);
        let mut holiday = approved(&handler, &loan, InterestHandling::Accrual);

        // 12000 * 6% / 12 = 60 a month
        let interest = handler
            .activate(&mut loan, &mut holiday, &test_time(), &mut AuditTrail::new())
            .unwrap();
        assert_eq!(interest, Money::from_major(180));
        assert_eq!(loan.current_balance(), Money::from_major(12_180));
        assert_eq!(loan.months(), 12);
        assert_eq!(holiday.status, HolidayStatus::Active);
    }

    #[test]
    fn test_deferral_extends_term_and_moves_schedule() {
        let handler = PaymentHolidayHandler::default();
        let mut loan = scheduled_loan(12_000, 6, 12);
        let mut holiday = approved(&handler, &loan, InterestHandling::Deferral);

        handler
            .activate(&mut loan, &mut holiday, &test_time(), &mut AuditTrail::new())
            .unwrap();

        assert_eq!(loan.months(), 15);
        assert_eq!(loan.current_balance(), Money::from_major(12_180));

        // rows dated 2025-01-01 and 2025-01-31 survive, the tail resumes on the holiday end
        let schedule = loan.schedule();
        assert_eq!(schedule.len(), 15);
        assert_eq!(schedule[1].payment_date, date(2025, 1, 31));
        assert_eq!(schedule[2].payment_number, 3);
        assert_eq!(schedule[2].payment_date, date(2025, 6, 2));
        assert_eq!(schedule.last().unwrap().remaining_balance, Money::ZERO);
    }

    #[test]
    fn test_workflow_is_forward_only() {
        let handler = PaymentHolidayHandler::default();
        let mut loan = scheduled_loan(12_000, 6, 12);
        let time = test_time();
        let mut audit = AuditTrail::new();

        let mut holiday = handler
            .request(&loan, date(2025, 3, 1), 2, InterestHandling::Accrual, "", &time, &mut audit)
            .unwrap();
        assert!(matches!(
            handler.activate(&mut loan, &mut holiday, &time, &mut audit),
            Err(AmortizationError::LogicError { .. })
        ));
        assert!(matches!(
            handler.complete(&mut loan, &mut holiday, &time, &mut audit),
            Err(AmortizationError::LogicError { .. })
        ));
        assert_eq!(loan.current_balance(), Money::from_major(12_000));

        handler.approve(&mut holiday, &time, &mut audit).unwrap();
        assert!(handler.approve(&mut holiday, &time, &mut audit).is_err());
        handler.activate(&mut loan, &mut holiday, &time, &mut audit).unwrap();
        handler.complete(&mut loan, &mut holiday, &time, &mut audit).unwrap();
        assert_eq!(holiday.status, HolidayStatus::Completed);
        assert!(handler.complete(&mut loan, &mut holiday, &time, &mut audit).is_err());
    }

    #[test]
    fn test_request_from_event() {
        let handler = PaymentHolidayHandler::default();
        let loan = scheduled_loan(12_000, 6, 12);
        let time = test_time();
        let mut audit = AuditTrail::new();

        let event = LoanEvent::payment_holiday(loan.id().unwrap(), date(2025, 4, 1), 2, InterestHandling::Deferral, "illness");
        assert!(handler.supports(&event));
        let holiday = handler.request_from_event(&loan, &event, &time, &mut audit).unwrap();
        assert_eq!(holiday.reason, "illness");
        assert_eq!(holiday.loan_id, loan.id());

        let other = LoanEvent::skip_payment(loan.id().unwrap(), date(2025, 4, 1), 1);
        assert!(handler.request_from_event(&loan, &other, &time, &mut audit).is_err());
    }
}
