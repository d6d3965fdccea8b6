pub mod arrears_payment;
pub mod extra_payment;
pub mod late_penalty;
pub mod partial_payment;
pub mod payment_holiday;
pub mod rate_change;
pub mod skip_payment;

use hourglass_rs::SafeTimeProvider;
use tracing::debug;

use crate::audit::AuditTrail;
use crate::config::EngineConfig;
use crate::errors::{AmortizationError, Result};
use crate::events::LoanEvent;
use crate::loan::Loan;

pub use arrears_payment::ArrearsPaymentHandler;
pub use extra_payment::ExtraPaymentHandler;
pub use late_penalty::LatePenaltyHandler;
pub use partial_payment::PartialPaymentHandler;
pub use payment_holiday::{HolidayStatus, PaymentHoliday, PaymentHolidayHandler};
pub use rate_change::RateChangeHandler;
pub use skip_payment::SkipPaymentHandler;

/// applies one kind of loan event
///
/// Handlers validate before they mutate. Once a handler starts changing the loan it finishes,
/// so an error from `handle` means the loan is untouched.
pub trait LoanEventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, event: &LoanEvent) -> bool;

    /// higher runs first
    fn priority(&self) -> i32;

    fn handle(
        &self,
        loan: &mut Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<()>;
}

pub(crate) fn unsupported(handler: &dyn LoanEventHandler, event: &LoanEvent) -> AmortizationError {
    AmortizationError::logic(format!(
        "{} cannot handle {} events",
        handler.name(),
        event.event_type()
    ))
}

/// runs every supporting handler over an event in priority order
#[derive(Default)]
pub struct HandlerDispatcher {
    handlers: Vec<Box<dyn LoanEventHandler>>,
}

impl HandlerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// dispatcher with every built-in handler registered
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(ArrearsPaymentHandler::new(config.arrears_policy, config.priorities.arrears_payment));
        dispatcher.register(LatePenaltyHandler::new(config.arrears_policy, config.priorities.late_penalty));
        dispatcher.register(RateChangeHandler::new(config.priorities.rate_change));
        dispatcher.register(PartialPaymentHandler::new(config.arrears_policy, config.priorities.partial_payment));
        dispatcher.register(ExtraPaymentHandler::with_priority(config.priorities.extra_payment));
        dispatcher.register(SkipPaymentHandler::new(config.skip_policy, config.priorities.skip_payment));
        dispatcher
    }

    pub fn register<H: LoanEventHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// supporting handlers, highest priority first; ties keep registration order
    pub fn handlers_for(&self, event: &LoanEvent) -> Vec<&dyn LoanEventHandler> {
        let mut matching: Vec<&dyn LoanEventHandler> = self
            .handlers
            .iter()
            .map(|h| h.as_ref())
            .filter(|h| h.supports(event))
            .collect();
        matching.sort_by_key(|h| std::cmp::Reverse(h.priority()));
        matching
    }

    /// apply every supporting handler to the same loan, each seeing the previous one's changes
    pub fn dispatch(
        &self,
        loan: &mut Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
        audit: &mut AuditTrail,
    ) -> Result<()> {
        let handlers = self.handlers_for(event);
        if handlers.is_empty() {
            return Err(AmortizationError::logic(format!(
                "no handler registered for {} events",
                event.event_type()
            )));
        }

        for handler in handlers {
            debug!(
                handler = handler.name(),
                priority = handler.priority(),
                event_type = event.event_type(),
                event_date = %event.event_date,
                "dispatching loan event"
            );
            handler.handle(loan, event, time_provider, audit)?;
        }
        Ok(())
    }
}
