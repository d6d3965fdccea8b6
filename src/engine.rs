use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, instrument};

use crate::audit::{AuditEvent, AuditTrail};
use crate::config::EngineConfig;
use crate::errors::{AmortizationError, Result};
use crate::events::{LoanEvent, LoanEventKind};
use crate::handlers::{HandlerDispatcher, LoanEventHandler, PaymentHoliday, PaymentHolidayHandler};
use crate::interest::PeriodicInterestCalculator;
use crate::loan::{Loan, LoanBuilder};
use crate::payments::{PaymentCalculator, ScheduleGenerator};
use crate::repository::LoanRepository;
use crate::state::{LoanSnapshot, SnapshotTrigger};
use crate::types::LoanId;

/// applies loan events in order and keeps the schedule in step
///
/// One engine serves one writer. Callers that share loans across threads serialize access per
/// loan before handing it in.
pub struct AmortizationEngine {
    config: EngineConfig,
    dispatcher: HandlerDispatcher,
    holidays: PaymentHolidayHandler,
    generator: ScheduleGenerator,
    audit: AuditTrail,
}

impl AmortizationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default())
    }

    fn build(config: EngineConfig) -> Self {
        let generator = ScheduleGenerator::with_interest(
            PaymentCalculator::with_precision(config.precision.internal),
            PeriodicInterestCalculator::new(),
        );
        Self {
            dispatcher: HandlerDispatcher::with_defaults(&config),
            holidays: PaymentHolidayHandler::with_generator(config.holiday_policy, generator.clone()),
            generator,
            audit: AuditTrail::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// register an extra handler alongside the built-in ones
    pub fn register_handler<H: LoanEventHandler + 'static>(&mut self, handler: H) {
        self.dispatcher.register(handler);
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn take_audit_events(&mut self) -> Vec<AuditEvent> {
        self.audit.take_events()
    }

    /// build a loan and its initial schedule
    pub fn originate(&mut self, builder: LoanBuilder, time_provider: &SafeTimeProvider) -> Result<Loan> {
        let mut loan = builder.build(time_provider)?;
        let rows = self.generator.regenerate_from(&loan, loan.start_date())?;
        loan.replace_schedule(rows, time_provider.now());

        info!(
            loan_id = ?loan.id(),
            principal = %loan.principal(),
            rate = %loan.annual_rate(),
            months = loan.months(),
            "loan originated"
        );
        self.audit.emit(AuditEvent::LoanOriginated {
            loan_id: loan.id(),
            principal: loan.principal(),
            annual_rate: loan.annual_rate(),
            months: loan.months(),
            timestamp: time_provider.now(),
        });
        Ok(loan)
    }

    /// apply one event, then rebuild the schedule tail if a handler asked for it
    #[instrument(skip_all, fields(event_type = event.event_type(), event_date = %event.event_date))]
    pub fn apply_event(
        &mut self,
        loan: &mut Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanSnapshot> {
        ensure_event_for(loan, event)?;

        match event.kind {
            LoanEventKind::PaymentHoliday { .. } => {
                self.grant_holiday(loan, event, time_provider)?;
            }
            _ => {
                self.dispatcher.dispatch(loan, event, time_provider, &mut self.audit)?;
                self.apply_pending_recalculation(loan, time_provider)?;
            }
        }

        Ok(LoanSnapshot::capture(
            loan,
            SnapshotTrigger::Event {
                event_type: event.event_type().to_string(),
                event_date: event.event_date,
            },
            time_provider,
        ))
    }

    /// apply events in date order; same-day events keep the order given
    pub fn replay(
        &mut self,
        loan: &mut Loan,
        events: impl IntoIterator<Item = LoanEvent>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<LoanSnapshot>> {
        let mut events: Vec<LoanEvent> = events.into_iter().collect();
        events.sort_by_key(|event| event.event_date);

        info!(loan_id = ?loan.id(), events = events.len(), "replaying loan events");
        events
            .iter()
            .map(|event| self.apply_event(loan, event, time_provider))
            .collect()
    }

    /// settle the next scheduled installment due by `as_of`
    pub fn record_scheduled_payment(
        &mut self,
        loan: &mut Loan,
        as_of: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanSnapshot> {
        let row = loan.record_scheduled_payment(as_of, time_provider.now())?;

        debug!(
            loan_id = ?loan.id(),
            payment_number = row.payment_number,
            balance = %loan.current_balance(),
            "scheduled payment recorded"
        );
        self.audit.emit(AuditEvent::ScheduledPaymentRecorded {
            loan_id: loan.id(),
            payment_number: row.payment_number,
            principal_portion: row.principal_amount,
            interest_portion: row.interest_amount,
            timestamp: time_provider.now(),
        });
        Ok(LoanSnapshot::capture(
            loan,
            SnapshotTrigger::ScheduledPayment {
                payment_number: row.payment_number,
            },
            time_provider,
        ))
    }

    /// request, approve and activate a holiday in one go
    pub fn grant_holiday(
        &mut self,
        loan: &mut Loan,
        event: &LoanEvent,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentHoliday> {
        ensure_event_for(loan, event)?;
        let mut holiday = self
            .holidays
            .request_from_event(loan, event, time_provider, &mut self.audit)?;
        self.holidays.approve(&mut holiday, time_provider, &mut self.audit)?;
        self.holidays
            .activate(loan, &mut holiday, time_provider, &mut self.audit)?;
        Ok(holiday)
    }

    pub fn complete_holiday(
        &mut self,
        loan: &mut Loan,
        holiday: &mut PaymentHoliday,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanSnapshot> {
        self.holidays
            .complete(loan, holiday, time_provider, &mut self.audit)?;
        Ok(LoanSnapshot::capture(loan, SnapshotTrigger::HolidayCompleted, time_provider))
    }

    /// load a stored loan, replay events against it and store the result
    pub fn process_stored<R: LoanRepository>(
        &mut self,
        repository: &mut R,
        loan_id: LoanId,
        events: impl IntoIterator<Item = LoanEvent>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let mut loan = repository.get(loan_id)?;
        let snapshots = self.replay(&mut loan, events, time_provider)?;
        repository.save(&mut loan)?;
        for snapshot in &snapshots {
            repository.record_snapshot(snapshot)?;
        }
        Ok(loan)
    }

    fn apply_pending_recalculation(&mut self, loan: &mut Loan, time_provider: &SafeTimeProvider) -> Result<()> {
        let Some(from_date) = loan.take_recalculation() else {
            return Ok(());
        };

        let rows = self.generator.regenerate_from(loan, from_date)?;
        let row_count = rows.len() as u32;
        loan.replace_schedule(rows, time_provider.now());

        self.audit.emit(AuditEvent::ScheduleRegenerated {
            loan_id: loan.id(),
            from_date,
            rows: row_count,
            timestamp: time_provider.now(),
        });
        Ok(())
    }
}

impl Default for AmortizationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn ensure_event_for(loan: &Loan, event: &LoanEvent) -> Result<()> {
    match loan.id() {
        Some(id) if id == event.loan_id => Ok(()),
        Some(id) => Err(AmortizationError::invalid(format!(
            "event for loan {} applied to loan {}",
            event.loan_id, id
        ))),
        None => Err(AmortizationError::invalid("loan must be saved before events are applied")),
    }
}
