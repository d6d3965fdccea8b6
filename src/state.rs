use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::payments::ScheduleSummary;
use crate::types::LoanId;

/// what caused a snapshot to be taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotTrigger {
    Origination,
    Event { event_type: String, event_date: NaiveDate },
    ScheduledPayment { payment_number: u32 },
    HolidayCompleted,
}

/// read-only copy of a loan handed to persistence and reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub snapshot_id: Uuid,
    pub loan_id: Option<LoanId>,
    pub timestamp: DateTime<Utc>,
    pub trigger: SnapshotTrigger,
    pub loan: Loan,
}

impl LoanSnapshot {
    pub fn capture(loan: &Loan, trigger: SnapshotTrigger, time_provider: &SafeTimeProvider) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            loan_id: loan.id(),
            timestamp: time_provider.now(),
            trigger,
            loan: loan.clone(),
        }
    }

    pub fn balance(&self) -> Money {
        self.loan.current_balance()
    }

    pub fn months(&self) -> u32 {
        self.loan.months()
    }

    /// totals over the remaining schedule rows
    pub fn remaining_schedule(&self) -> ScheduleSummary {
        let paid = self.loan.payments_made();
        let remaining: Vec<_> = self
            .loan
            .schedule()
            .iter()
            .filter(|row| row.payment_number > paid)
            .cloned()
            .collect();
        ScheduleSummary::from_rows(&remaining)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::payments::ScheduleGenerator;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let mut loan = Loan::builder()
            .principal(Money::from_major(1_200))
            .annual_rate(Rate::ZERO)
            .months(12)
            .build(&time)
            .unwrap();
        let rows = ScheduleGenerator::new().regenerate_from(&loan, loan.start_date()).unwrap();
        loan.replace_schedule(rows, time.now());

        let snapshot = LoanSnapshot::capture(&loan, SnapshotTrigger::Origination, &time);
        assert_eq!(snapshot.balance(), Money::from_major(1_200));
        assert_eq!(snapshot.remaining_schedule().total_principal, Money::from_major(1_200));

        let restored = LoanSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }
}
