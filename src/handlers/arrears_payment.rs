use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::ArrearsPolicy;
use crate::decimal::Money;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::Loan;

use super::{unsupported, LoanEventHandler};

/// pays down overdue amounts, oldest record first
///
/// Within a record the payment clears penalty, then interest, then principal. Only the principal
/// share reduces the loan balance. Whatever is left after every record is cleared is not applied
/// to the loan and shows up as `remaining` on the last audit record.
#[derive(Debug, Clone)]
pub struct ArrearsPaymentHandler {
    policy: ArrearsPolicy,
    priority: i32,
}

impl Default for ArrearsPaymentHandler {
    fn default() -> Self {
        Self::new(ArrearsPolicy::default(), 100)
    }
}

impl ArrearsPaymentHandler {
    pub fn new(policy: ArrearsPolicy, priority: i32) -> Self {
        Self { policy, priority }
    }
}

impl LoanEventHandler for ArrearsPaymentHandler {
    fn name(&self) -> &'static str {
        "arrears_payment"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::ArrearsPayment { .. })
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
        let LoanEventKind::ArrearsPayment { amount } = event.kind else {
            return Err(unsupported(self, event));
        };

        if !amount.is_positive() {
            return Err(AmortizationError::invalid(format!(
                "arrears payment must be positive, got {}",
                amount
            )));
        }
        let tolerance = self.policy.clearance_tolerance;
        if loan.active_arrears(tolerance).next().is_none() {
            return Err(AmortizationError::logic("loan has no outstanding arrears to pay"));
        }

        let now = time_provider.now();
        let loan_id = loan.id();
        let mut remaining = amount.round_currency();
        let mut to_principal = Money::ZERO;
        let mut applications = Vec::new();

        for arrears in loan.active_arrears_mut(tolerance) {
            if !remaining.is_positive() {
                break;
            }
            let application = arrears.apply_payment(remaining)?;
            remaining = application.remaining;
            to_principal += application.to_principal;
            applications.push((arrears.id(), application));
        }

        if loan.reduce_balance(to_principal, now)?.is_positive() {
            loan.request_recalculation(event.event_date);
        }

        for (arrears_id, application) in applications {
            audit.emit(AuditEvent::ArrearsPaymentApplied {
                loan_id,
                arrears_id,
                application,
                timestamp: now,
            });
        }

        if remaining.is_positive() {
            warn!(loan_id = ?loan_id, %remaining, "arrears payment exceeded outstanding arrears");
        }
        info!(
            loan_id = ?loan_id,
            %amount,
            %to_principal,
            outstanding = %loan.total_arrears(tolerance),
            "arrears payment applied"
        );
        Ok(())
    }
}
