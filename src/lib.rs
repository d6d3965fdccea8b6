pub mod audit;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod interest;
pub mod loan;
pub mod payments;
pub mod repository;
pub mod state;
pub mod types;

// re-export key types
pub use audit::{AuditEvent, AuditTrail};
pub use config::{EngineConfig, SkipPenaltyBase};
pub use decimal::{DecimalMath, Money, Rate};
pub use engine::AmortizationEngine;
pub use errors::{AmortizationError, Result};
pub use events::{LoanEvent, LoanEventKind, RawLoanEvent};
pub use handlers::{
    ArrearsPaymentHandler, ExtraPaymentHandler, HandlerDispatcher, HolidayStatus, LatePenaltyHandler,
    LoanEventHandler, PartialPaymentHandler, PaymentHoliday, PaymentHolidayHandler, RateChangeHandler,
    SkipPaymentHandler,
};
pub use interest::{
    CompoundInterest, CompoundInterestCalculator, DailyInterest, DailyInterestCalculator, DayCountBasis,
    EffectiveRateCalculator, InterestCalculation, InterestRateConverter, PeriodicInterest,
    PeriodicInterestCalculator, SimpleInterest, SimpleInterestCalculator,
};
pub use loan::{Arrears, ArrearsApplication, Loan, LoanBuilder, RatePeriod};
pub use payments::{PaymentCalculator, ScheduleGenerator, ScheduleRequest, ScheduleRow, ScheduleSummary};
pub use repository::{InMemoryLoanRepository, LoanRepository};
pub use state::{LoanSnapshot, SnapshotTrigger};
pub use types::{ExtraPaymentStrategy, InterestHandling, LoanId, PaymentFrequency};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
