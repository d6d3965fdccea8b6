use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::ArrearsPolicy;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::Loan;

use super::{unsupported, LoanEventHandler};

/// charges a late fee onto the oldest outstanding arrears
#[derive(Debug, Clone)]
pub struct LatePenaltyHandler {
    policy: ArrearsPolicy,
    priority: i32,
}

impl Default for LatePenaltyHandler {
    fn default() -> Self {
        Self::new(ArrearsPolicy::default(), 90)
    }
}

impl LatePenaltyHandler {
    pub fn new(policy: ArrearsPolicy, priority: i32) -> Self {
        Self { policy, priority }
    }
}

impl LoanEventHandler for LatePenaltyHandler {
    fn name(&self) -> &'static str {
        "late_penalty"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::LatePenalty { .. })
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
        let LoanEventKind::LatePenalty { amount } = event.kind else {
            return Err(unsupported(self, event));
        };

        if !amount.is_positive() {
            return Err(AmortizationError::invalid(format!(
                "late penalty must be positive, got {}",
                amount
            )));
        }

        let loan_id = loan.id();
        let arrears = loan
            .first_active_arrears_mut(self.policy.clearance_tolerance)
            .ok_or_else(|| AmortizationError::logic("late penalty requires outstanding arrears"))?;
        arrears.add_penalty(amount)?;
        let arrears_id = arrears.id();

        let now = time_provider.now();
        loan.touch(now);

        info!(loan_id = ?loan_id, %amount, %arrears_id, "late penalty charged");
        audit.emit(AuditEvent::LatePenaltyApplied {
            loan_id,
            arrears_id,
            amount,
            timestamp: now,
        });
        Ok(())
    }
}
