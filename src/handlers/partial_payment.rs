use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::ArrearsPolicy;
use crate::decimal::Money;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::{Arrears, Loan};

use super::{unsupported, LoanEventHandler};

/// payments below the regular installment; the gap becomes arrears
#[derive(Debug, Clone)]
pub struct PartialPaymentHandler {
    policy: ArrearsPolicy,
    priority: i32,
}

impl Default for PartialPaymentHandler {
    fn default() -> Self {
        Self::new(ArrearsPolicy::default(), 60)
    }
}

impl PartialPaymentHandler {
    pub fn new(policy: ArrearsPolicy, priority: i32) -> Self {
        Self { policy, priority }
    }
}

impl LoanEventHandler for PartialPaymentHandler {
    fn name(&self) -> &'static str {
        "partial_payment"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::PartialPayment { .. })
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
        let LoanEventKind::PartialPayment { amount } = event.kind else {
            return Err(unsupported(self, event));
        };

        if amount.is_negative() {
            return Err(AmortizationError::invalid(format!(
                "partial payment must not be negative, got {}",
                amount
            )));
        }

        let regular_payment = loan.regular_payment_for(event.event_date)?;
        if amount > regular_payment {
            return Err(AmortizationError::logic(format!(
                "payment {} exceeds the regular payment {}, record it as an extra payment",
                amount, regular_payment
            )));
        }

        let now = time_provider.now();
        let shortfall = (regular_payment - amount).round_currency();

        if shortfall.is_positive() {
            let tolerance = self.policy.clearance_tolerance;
            let days = self.policy.days_per_shortfall;
            let loan_id = loan.id();

            let (arrears_id, principal_amount, days_overdue) = match loan.first_active_arrears_mut(tolerance) {
                Some(arrears) => {
                    arrears.add_shortfall(shortfall, days)?;
                    (arrears.id(), arrears.principal_amount(), arrears.days_overdue())
                }
                None => {
                    let arrears = Arrears::new(loan_id, shortfall, Money::ZERO, 0)?;
                    let recorded = (arrears.id(), arrears.principal_amount(), arrears.days_overdue());
                    loan.add_arrears(arrears, now)?;
                    recorded
                }
            };

            warn!(
                loan_id = ?loan_id,
                %shortfall,
                arrears_principal = %principal_amount,
                days_overdue,
                "partial payment left a shortfall"
            );
            audit.emit(AuditEvent::ArrearsRecorded {
                loan_id,
                arrears_id,
                principal_amount,
                days_overdue,
                timestamp: now,
            });
        }

        if loan.reduce_balance(amount, now)?.is_positive() {
            loan.request_recalculation(event.event_date);
        }

        info!(loan_id = ?loan.id(), %amount, %regular_payment, "partial payment applied");
        audit.emit(AuditEvent::PartialPaymentApplied {
            loan_id: loan.id(),
            amount,
            regular_payment,
            shortfall,
            timestamp: now,
        });
        Ok(())
    }
}
