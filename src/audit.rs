use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::handlers::HolidayStatus;
use crate::loan::ArrearsApplication;
use crate::types::{ExtraPaymentStrategy, InterestHandling, LoanId};

/// audit records emitted while events are applied to a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoanOriginated {
        loan_id: Option<LoanId>,
        principal: Money,
        annual_rate: Rate,
        months: u32,
        timestamp: DateTime<Utc>,
    },

    // payment events
    ScheduledPaymentRecorded {
        loan_id: Option<LoanId>,
        payment_number: u32,
        principal_portion: Money,
        interest_portion: Money,
        timestamp: DateTime<Utc>,
    },
    ExtraPaymentApplied {
        loan_id: Option<LoanId>,
        extra_payment: Money,
        strategy: ExtraPaymentStrategy,
        resulting_months: u32,
        interest_savings: Money,
        /// only set for the reduce-payment strategy
        payment_reduction: Option<Money>,
        timestamp: DateTime<Utc>,
    },
    PartialPaymentApplied {
        loan_id: Option<LoanId>,
        amount: Money,
        regular_payment: Money,
        shortfall: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentsSkipped {
        loan_id: Option<LoanId>,
        payments: u32,
        penalty: Money,
        resulting_months: u32,
        timestamp: DateTime<Utc>,
    },

    // arrears events
    ArrearsRecorded {
        loan_id: Option<LoanId>,
        arrears_id: Uuid,
        principal_amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    ArrearsPaymentApplied {
        loan_id: Option<LoanId>,
        arrears_id: Uuid,
        application: ArrearsApplication,
        timestamp: DateTime<Utc>,
    },
    LatePenaltyApplied {
        loan_id: Option<LoanId>,
        arrears_id: Uuid,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // rate events
    RateChanged {
        loan_id: Option<LoanId>,
        old_rate: Rate,
        new_rate: Rate,
        effective_from: NaiveDate,
        effective_until: Option<NaiveDate>,
        timestamp: DateTime<Utc>,
    },

    // holiday events
    HolidayStatusChanged {
        loan_id: Option<LoanId>,
        holiday_id: Uuid,
        old_status: Option<HolidayStatus>,
        new_status: HolidayStatus,
        timestamp: DateTime<Utc>,
    },
    HolidayInterestApplied {
        loan_id: Option<LoanId>,
        holiday_id: Uuid,
        interest_handling: InterestHandling,
        interest: Money,
        months_added: u32,
        timestamp: DateTime<Utc>,
    },

    ScheduleRegenerated {
        loan_id: Option<LoanId>,
        from_date: NaiveDate,
        rows: u32,
        timestamp: DateTime<Utc>,
    },
}

/// collects audit events during operations
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<AuditEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }
}
