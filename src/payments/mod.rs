pub mod calculator;
pub mod schedule;

pub use calculator::PaymentCalculator;
pub use schedule::{ScheduleGenerator, ScheduleRequest, ScheduleRow, ScheduleSummary};
