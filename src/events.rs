use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::types::{ExtraPaymentStrategy, InterestHandling, LoanId};

/// something that happened to a loan and must be replayed against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEvent {
    pub loan_id: LoanId,
    pub event_date: NaiveDate,
    #[serde(flatten)]
    pub kind: LoanEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// typed payload per event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LoanEventKind {
    SkipPayment {
        payments: u32,
    },
    ExtraPayment {
        amount: Money,
        #[serde(default)]
        strategy: ExtraPaymentStrategy,
    },
    PartialPayment {
        amount: Money,
    },
    PaymentHoliday {
        months: u32,
        interest_handling: InterestHandling,
        #[serde(default)]
        reason: String,
    },
    RateChange {
        new_rate: Rate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    ArrearsPayment {
        amount: Money,
    },
    LatePenalty {
        amount: Money,
    },
}

impl LoanEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            LoanEventKind::SkipPayment { .. } => "skip_payment",
            LoanEventKind::ExtraPayment { .. } => "extra_payment",
            LoanEventKind::PartialPayment { .. } => "partial_payment",
            LoanEventKind::PaymentHoliday { .. } => "payment_holiday",
            LoanEventKind::RateChange { .. } => "rate_change",
            LoanEventKind::ArrearsPayment { .. } => "arrears_payment",
            LoanEventKind::LatePenalty { .. } => "late_penalty",
        }
    }
}

impl LoanEvent {
    pub fn new(loan_id: LoanId, event_date: NaiveDate, kind: LoanEventKind) -> Self {
        Self {
            loan_id,
            event_date,
            kind,
            notes: None,
        }
    }

    pub fn skip_payment(loan_id: LoanId, event_date: NaiveDate, payments: u32) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::SkipPayment { payments })
    }

    pub fn extra_payment(
        loan_id: LoanId,
        event_date: NaiveDate,
        amount: Money,
        strategy: ExtraPaymentStrategy,
    ) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::ExtraPayment { amount, strategy })
    }

    pub fn partial_payment(loan_id: LoanId, event_date: NaiveDate, amount: Money) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::PartialPayment { amount })
    }

    pub fn payment_holiday(
        loan_id: LoanId,
        event_date: NaiveDate,
        months: u32,
        interest_handling: InterestHandling,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            loan_id,
            event_date,
            LoanEventKind::PaymentHoliday {
                months,
                interest_handling,
                reason: reason.into(),
            },
        )
    }

    pub fn rate_change(loan_id: LoanId, event_date: NaiveDate, new_rate: Rate, end_date: Option<NaiveDate>) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::RateChange { new_rate, end_date })
    }

    pub fn arrears_payment(loan_id: LoanId, event_date: NaiveDate, amount: Money) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::ArrearsPayment { amount })
    }

    pub fn late_penalty(loan_id: LoanId, event_date: NaiveDate, amount: Money) -> Self {
        Self::new(loan_id, event_date, LoanEventKind::LatePenalty { amount })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

impl fmt::Display for LoanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} for loan {}", self.event_type(), self.event_date, self.loan_id)
    }
}

/// flat event record as stored by older persistence layers
///
/// `amount` is overloaded per type: a skip count for skips, a month count for holidays and a
/// percentage for rate changes. Strategy and interest handling ride in `notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLoanEvent {
    pub event_type: String,
    pub loan_id: LoanId,
    pub event_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<RawLoanEvent> for LoanEvent {
    type Error = AmortizationError;

    fn try_from(raw: RawLoanEvent) -> Result<Self> {
        let notes = raw.notes.as_deref().unwrap_or_default();

        let kind = match raw.event_type.trim().to_ascii_lowercase().as_str() {
            "skip_payment" | "skip_payments" => LoanEventKind::SkipPayment {
                payments: whole_count("skip count", raw.amount)?,
            },
            "extra_payment" => LoanEventKind::ExtraPayment {
                amount: Money::from_decimal(raw.amount),
                strategy: if notes.contains("reduce_payment") {
                    ExtraPaymentStrategy::ReducePayment
                } else {
                    ExtraPaymentStrategy::ReduceTerm
                },
            },
            "partial_payment" => LoanEventKind::PartialPayment {
                amount: Money::from_decimal(raw.amount),
            },
            "payment_holiday" => LoanEventKind::PaymentHoliday {
                months: whole_count("holiday months", raw.amount)?,
                interest_handling: if notes.to_ascii_lowercase().contains("deferral") {
                    InterestHandling::Deferral
                } else {
                    InterestHandling::Accrual
                },
                reason: notes.to_string(),
            },
            "rate_change" => LoanEventKind::RateChange {
                new_rate: Rate::from_percent(raw.amount),
                end_date: None,
            },
            "arrears_payment" => LoanEventKind::ArrearsPayment {
                amount: Money::from_decimal(raw.amount),
            },
            "late_penalty" => LoanEventKind::LatePenalty {
                amount: Money::from_decimal(raw.amount),
            },
            other => {
                return Err(AmortizationError::invalid(format!(
                    "unrecognized event type '{}'",
                    other
                )))
            }
        };

        Ok(LoanEvent {
            loan_id: raw.loan_id,
            event_date: raw.event_date,
            kind,
            notes: raw.notes,
        })
    }
}

// fractional counts truncate toward zero
fn whole_count(name: &str, amount: Decimal) -> Result<u32> {
    amount
        .trunc()
        .to_u32()
        .ok_or_else(|| AmortizationError::invalid(format!("{} must be a non-negative whole number, got {}", name, amount)))
}
