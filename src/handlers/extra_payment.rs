use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::decimal::{round_half_up, Money};
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::Loan;
use crate::payments::PaymentCalculator;
use crate::types::ExtraPaymentStrategy;

use super::{unsupported, LoanEventHandler};

/// result of an extra payment, also recorded on the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraPaymentOutcome {
    pub resulting_months: u32,
    /// reduce_term: balance after the extra payment × monthly rate × months saved
    pub interest_savings: Money,
    pub payment_reduction: Option<Money>,
}

/// applies lump sums on top of the regular installment
#[derive(Debug, Clone)]
pub struct ExtraPaymentHandler {
    priority: i32,
    payments: PaymentCalculator,
}

impl Default for ExtraPaymentHandler {
    fn default() -> Self {
        Self::with_priority(30)
    }
}

impl ExtraPaymentHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            payments: PaymentCalculator::new(),
        }
    }

    /// keep the installment and shorten the term in proportion to the principal repaid
    fn reduce_term(&self, loan: &mut Loan, event: &LoanEvent, amount: Money, now: DateTime<Utc>) -> Result<ExtraPaymentOutcome> {
        let original_months = loan.months();
        let share = amount.checked_div(loan.principal().as_decimal())?.as_decimal();
        let reduction = round_half_up(share * Decimal::from(original_months), 0)
            .to_u32()
            .unwrap_or(original_months);
        let resulting_months = original_months.saturating_sub(reduction).max(1);

        loan.reduce_balance(amount, now)?;
        loan.set_months(resulting_months, now)?;

        let months_saved = Decimal::from(original_months - resulting_months);
        let monthly_rate = loan.effective_rate(event.event_date).monthly_rate().as_decimal();
        let interest_savings = (loan.current_balance() * monthly_rate * months_saved).round_currency();

        Ok(ExtraPaymentOutcome {
            resulting_months,
            interest_savings,
            payment_reduction: None,
        })
    }

    /// keep the term and lower the installment
    fn reduce_payment(&self, loan: &mut Loan, event: &LoanEvent, amount: Money, now: DateTime<Utc>) -> Result<ExtraPaymentOutcome> {
        let rate = loan.effective_rate(event.event_date);
        let remaining = loan.remaining_payments().max(1);
        let old_payment = if loan.schedule().is_empty() {
            self.payments
                .calculate(loan.current_balance(), rate, loan.payment_frequency(), remaining)?
        } else {
            loan.regular_payment_for(event.event_date)?
        };

        loan.reduce_balance(amount, now)?;

        let new_payment = if loan.current_balance().is_positive() {
            self.payments
                .calculate(loan.current_balance(), rate, loan.payment_frequency(), remaining)?
        } else {
            Money::ZERO
        };
        let payment_reduction = (old_payment - new_payment).non_negative();
        // lower installments over the same term, less the principal prepaid now
        let interest_savings = (payment_reduction * Decimal::from(remaining) - amount)
            .round_currency()
            .non_negative();

        Ok(ExtraPaymentOutcome {
            resulting_months: loan.months(),
            interest_savings,
            payment_reduction: Some(payment_reduction),
        })
    }
}

impl LoanEventHandler for ExtraPaymentHandler {
    fn name(&self) -> &'static str {
        "extra_payment"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::ExtraPayment { .. })
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn handle(
        &self,
        loan: &mut Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<()> {
        let LoanEventKind::ExtraPayment { amount, strategy } = event.kind else {
            return Err(unsupported(self, event));
        };

        if !amount.is_positive() {
            return Err(AmortizationError::invalid(format!(
                "extra payment must be positive, got {}",
                amount
            )));
        }
        if amount > loan.current_balance() {
            return Err(AmortizationError::invalid(format!(
                "extra payment {} exceeds outstanding balance {}",
                amount,
                loan.current_balance()
            )));
        }

        let now = time_provider.now();
        let outcome = match strategy {
            ExtraPaymentStrategy::ReduceTerm => self.reduce_term(loan, event, amount, now)?,
            ExtraPaymentStrategy::ReducePayment => self.reduce_payment(loan, event, amount, now)?,
        };
        loan.request_recalculation(event.event_date);

        info!(
            loan_id = ?loan.id(),
            %amount,
            ?strategy,
            months = outcome.resulting_months,
            balance = %loan.current_balance(),
            "extra payment applied"
        );
        audit.emit(AuditEvent::ExtraPaymentApplied {
            loan_id: loan.id(),
            extra_payment: amount,
            strategy,
            resulting_months: outcome.resulting_months,
            interest_savings: outcome.interest_savings,
            payment_reduction: outcome.payment_reduction,
            timestamp: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;

    fn extra(loan: &Loan, amount: i64, strategy: ExtraPaymentStrategy) -> LoanEvent {
        LoanEvent::extra_payment(loan.id().unwrap(), date(2025, 1, 1), Money::from_major(amount), strategy)
    }

    #[test]
    fn test_reduce_term() {
        let handler = ExtraPaymentHandler::new();
        let mut loan = scheduled_loan(10_000, 5, 60);
        let mut audit = AuditTrail::new();

        let event = extra(&loan, 2_000, ExtraPaymentStrategy::ReduceTerm);
        handler.handle(&mut loan, &event, &test_time(), &mut audit).unwrap();

        // 2000 / 10000 of 60 months
        assert_eq!(loan.months(), 48);
        assert_eq!(loan.current_balance(), Money::from_major(8_000));
        assert_eq!(loan.pending_recalculation(), Some(date(2025, 1, 1)));

        match &audit.events()[0] {
            AuditEvent::ExtraPaymentApplied { resulting_months, interest_savings, payment_reduction, .. } => {
                assert_eq!(*resulting_months, 48);
                // 8000 * 5%/12 * 12
                assert_eq!(*interest_savings, Money::from_major(400));
                assert!(payment_reduction.is_none());
            }
            other => panic!("unexpected audit event {:?}", other),
        }
    }

    #[test]
    fn test_reduce_term_never_goes_below_one() {
        let handler = ExtraPaymentHandler::new();
        let mut loan = scheduled_loan(10_000, 5, 6);
        let event = extra(&loan, 10_000, ExtraPaymentStrategy::ReduceTerm);
        handler.handle(&mut loan, &event, &test_time(), &mut AuditTrail::new()).unwrap();

        assert_eq!(loan.months(), 1);
        assert!(loan.is_paid_off());
    }

    #[test]
    fn test_reduce_payment_keeps_term() {
        let handler = ExtraPaymentHandler::new();
        let mut loan = scheduled_loan(10_000, 5, 60);
        let old_payment = loan.schedule()[0].payment_amount;
        let mut audit = AuditTrail::new();

        let event = extra(&loan, 2_000, ExtraPaymentStrategy::ReducePayment);
        handler.handle(&mut loan, &event, &test_time(), &mut audit).unwrap();

        assert_eq!(loan.months(), 60);
        assert_eq!(loan.current_balance(), Money::from_major(8_000));
        match &audit.events()[0] {
            AuditEvent::ExtraPaymentApplied { payment_reduction: Some(reduction), .. } => {
                assert!(reduction.is_positive());
                assert!(*reduction < old_payment);
            }
            other => panic!("unexpected audit event {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let handler = ExtraPaymentHandler::new();
        let time = test_time();
        let mut loan = scheduled_loan(10_000, 5, 60);

        for amount in [0, -5, 10_001] {
            let event = extra(&loan, amount, ExtraPaymentStrategy::ReduceTerm);
            assert!(matches!(
                handler.handle(&mut loan, &event, &time, &mut AuditTrail::new()),
                Err(AmortizationError::InvalidArgument { .. })
            ));
        }
        assert_eq!(loan.months(), 60);
        assert_eq!(loan.current_balance(), Money::from_major(10_000));
    }
}
