use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::{SkipPaymentPolicy, SkipPenaltyBase};
use crate::decimal::Money;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::Loan;
use crate::payments::PaymentCalculator;

use super::{unsupported, LoanEventHandler};

/// skips payments by pushing them onto the end of the term, for a penalty
#[derive(Debug, Clone)]
pub struct SkipPaymentHandler {
    policy: SkipPaymentPolicy,
    priority: i32,
    payments: PaymentCalculator,
}

impl Default for SkipPaymentHandler {
    fn default() -> Self {
        Self::new(SkipPaymentPolicy::default(), 20)
    }
}

impl SkipPaymentHandler {
    pub fn new(policy: SkipPaymentPolicy, priority: i32) -> Self {
        Self {
            policy,
            priority,
            payments: PaymentCalculator::new(),
        }
    }

    /// penalty for skipping `count` payments, in cents
    pub fn penalty(&self, loan: &Loan, event: &LoanEvent, count: u32) -> Result<Money> {
        let base = match self.policy.penalty_base {
            SkipPenaltyBase::AverageInstallment => loan.principal().checked_div(Decimal::from(loan.months()))?,
            SkipPenaltyBase::AmortizedPayment if loan.current_balance().is_positive() => self.payments.calculate(
                loan.current_balance(),
                loan.effective_rate(event.event_date),
                loan.payment_frequency(),
                loan.remaining_payments().max(1),
            )?,
            SkipPenaltyBase::AmortizedPayment => Money::ZERO,
        };
        Ok((base * self.policy.penalty_rate * Decimal::from(count)).round_currency())
    }
}

impl LoanEventHandler for SkipPaymentHandler {
    fn name(&self) -> &'static str {
        "skip_payment"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::SkipPayment { .. })
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
        let LoanEventKind::SkipPayment { payments } = event.kind else {
            return Err(unsupported(self, event));
        };

        if payments < 1 || payments > self.policy.max_payments {
            return Err(AmortizationError::invalid(format!(
                "can skip between 1 and {} payments, got {}",
                self.policy.max_payments, payments
            )));
        }

        let penalty = self.penalty(loan, event, payments)?;
        let new_months = loan
            .months()
            .checked_add(payments)
            .ok_or_else(|| AmortizationError::invalid(format!("cannot extend term by {}", payments)))?;

        let now = time_provider.now();
        loan.set_months(new_months, now)?;
        loan.increase_balance(penalty, now)?;
        loan.request_recalculation(event.event_date);

        info!(
            loan_id = ?loan.id(),
            payments,
            %penalty,
            months = new_months,
            "payments skipped"
        );
        audit.emit(AuditEvent::PaymentsSkipped {
            loan_id: loan.id(),
            payments,
            penalty,
            resulting_months: new_months,
            timestamp: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::handlers::test_support::*;

    fn skip(loan: &Loan, payments: u32) -> LoanEvent {
        LoanEvent::skip_payment(loan.id().unwrap(), date(2025, 3, 1), payments)
    }

    #[test]
    fn test_skip_extends_term_and_charges_penalty() {
        let handler = SkipPaymentHandler::default();
        let mut loan = scheduled_loan(12_000, 6, 12);
        let mut audit = AuditTrail::new();

        let event = skip(&loan, 2);
        handler.handle(&mut loan, &event, &test_time(), &mut audit).unwrap();

        // 12000 / 12 * 2% * 2
        assert_eq!(loan.months(), 14);
        assert_eq!(loan.current_balance(), Money::from_major(12_040));
        assert_eq!(loan.pending_recalculation(), Some(date(2025, 3, 1)));
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn test_skip_count_bounds() {
        let handler = SkipPaymentHandler::default();
        let time = test_time();

        for rejected in [0, 13] {
            let mut loan = scheduled_loan(12_000, 6, 12);
            let event = skip(&loan, rejected);
            assert!(matches!(
                handler.handle(&mut loan, &event, &time, &mut AuditTrail::new()),
                Err(AmortizationError::InvalidArgument { .. })
            ));
            assert_eq!(loan.months(), 12);
            assert_eq!(loan.current_balance(), Money::from_major(12_000));
        }

        for accepted in [1, 12] {
            let mut loan = scheduled_loan(12_000, 6, 12);
            let event = skip(&loan, accepted);
            handler.handle(&mut loan, &event, &time, &mut AuditTrail::new()).unwrap();
            assert_eq!(loan.months(), 12 + accepted);
        }
    }

    #[test]
    fn test_amortized_penalty_base() {
        let config = EngineConfig::default().with_amortized_skip_penalty();
        let handler = SkipPaymentHandler::new(config.skip_policy, 20);
        let loan = scheduled_loan(100_000, 12, 12);
        let event = skip(&loan, 1);

        // 8884.88 * 2%
        assert_eq!(handler.penalty(&loan, &event, 1).unwrap(), Money::from_str_exact("177.70").unwrap());
    }

    #[test]
    fn test_rejects_other_events() {
        let handler = SkipPaymentHandler::default();
        let mut loan = scheduled_loan(12_000, 6, 12);
        let event = LoanEvent::partial_payment(loan.id().unwrap(), date(2025, 3, 1), Money::from_major(5));
        assert!(!handler.supports(&event));
        assert!(matches!(
            handler.handle(&mut loan, &event, &test_time(), &mut AuditTrail::new()),
            Err(AmortizationError::LogicError { .. })
        ));
    }
}
