use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::errors::Result;
use crate::events::{LoanEvent, LoanEventKind};
use crate::loan::{Loan, RatePeriod};

use super::{unsupported, LoanEventHandler};

/// variable rate resets, recorded as rate periods
#[derive(Debug, Clone)]
pub struct RateChangeHandler {
    priority: i32,
}

impl Default for RateChangeHandler {
    fn default() -> Self {
        Self::new(80)
    }
}

impl RateChangeHandler {
    pub fn new(priority: i32) -> Self {
        Self { priority }
    }
}

impl LoanEventHandler for RateChangeHandler {
    fn name(&self) -> &'static str {
        "rate_change"
    }

    fn supports(&self, event: &LoanEvent) -> bool {
        matches!(event.kind, LoanEventKind::RateChange { .. })
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
        let LoanEventKind::RateChange { new_rate, end_date } = event.kind else {
            return Err(unsupported(self, event));
        };

        let period = RatePeriod::new(loan.id(), new_rate, event.event_date, end_date)?;
        let old_rate = loan.effective_rate(event.event_date);

        let now = time_provider.now();
        loan.add_rate_period(period, now)?;
        loan.request_recalculation(event.event_date);

        info!(
            loan_id = ?loan.id(),
            %old_rate,
            %new_rate,
            from = %event.event_date,
            "interest rate changed"
        );
        audit.emit(AuditEvent::RateChanged {
            loan_id: loan.id(),
            old_rate,
            new_rate,
            effective_from: event.event_date,
            effective_until: end_date,
            timestamp: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::errors::AmortizationError;
    use crate::handlers::test_support::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_change_adds_period() {
        let handler = RateChangeHandler::default();
        let mut loan = scheduled_loan(10_000, 5, 60);
        let mut audit = AuditTrail::new();

        let event = LoanEvent::rate_change(loan.id().unwrap(), date(2025, 6, 1), Rate::from_percentage(7), None);
        handler.handle(&mut loan, &event, &test_time(), &mut audit).unwrap();

        assert_eq!(loan.rate_periods().len(), 1);
        assert_eq!(loan.effective_rate(date(2025, 5, 31)), Rate::from_percentage(5));
        assert_eq!(loan.effective_rate(date(2025, 6, 1)), Rate::from_percentage(7));
        assert_eq!(loan.pending_recalculation(), Some(date(2025, 6, 1)));
        assert!(matches!(
            audit.events()[0],
            AuditEvent::RateChanged { ref old_rate, .. } if *old_rate == Rate::from_percentage(5)
        ));
    }

    #[test]
    fn test_rejects_rates_outside_unit_interval() {
        let handler = RateChangeHandler::default();
        let mut loan = scheduled_loan(10_000, 5, 60);
        let event = LoanEvent::rate_change(loan.id().unwrap(), date(2025, 6, 1), Rate::from_decimal(dec!(1.5)), None);
        assert!(matches!(
            handler.handle(&mut loan, &event, &test_time(), &mut AuditTrail::new()),
            Err(AmortizationError::InvalidArgument { .. })
        ));
        assert!(loan.rate_periods().is_empty());
        assert_eq!(loan.pending_recalculation(), None);
    }
}
