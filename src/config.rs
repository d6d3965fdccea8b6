use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, INTERNAL_PRECISION, OUTPUT_PRECISION};
use crate::errors::{AmortizationError, Result};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub precision: PrecisionConfig,
    pub skip_policy: SkipPaymentPolicy,
    pub arrears_policy: ArrearsPolicy,
    pub holiday_policy: HolidayPolicy,
    pub priorities: HandlerPriorities,
}

/// decimal precision used by the calculators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionConfig {
    pub internal: u32,
    pub output: u32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            internal: INTERNAL_PRECISION,
            output: OUTPUT_PRECISION,
        }
    }
}

/// base amount the skip penalty percentage is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPenaltyBase {
    /// principal / months, the historical approximation
    AverageInstallment,
    /// the exact annuity payment for the current balance and remaining term
    AmortizedPayment,
}

/// skip payment rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipPaymentPolicy {
    /// penalty per skipped payment as a fraction of the base (0.02 = 2%)
    pub penalty_rate: Decimal,
    pub max_payments: u32,
    pub penalty_base: SkipPenaltyBase,
}

impl Default for SkipPaymentPolicy {
    fn default() -> Self {
        Self {
            penalty_rate: dec!(0.02),
            max_payments: 12,
            penalty_base: SkipPenaltyBase::AverageInstallment,
        }
    }
}

/// arrears bookkeeping rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrearsPolicy {
    /// days overdue added each time a shortfall lands on an existing record
    pub days_per_shortfall: u32,
    /// arrears below this total count as cleared
    pub clearance_tolerance: Money,
}

impl Default for ArrearsPolicy {
    fn default() -> Self {
        Self {
            days_per_shortfall: 30,
            clearance_tolerance: Money::CENT,
        }
    }
}

/// payment holiday rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidayPolicy {
    pub max_months: u32,
}

impl Default for HolidayPolicy {
    fn default() -> Self {
        Self { max_months: 12 }
    }
}

/// dispatch priorities, higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerPriorities {
    pub arrears_payment: i32,
    pub late_penalty: i32,
    pub rate_change: i32,
    pub partial_payment: i32,
    pub extra_payment: i32,
    pub skip_payment: i32,
}

impl Default for HandlerPriorities {
    fn default() -> Self {
        Self {
            arrears_payment: 100,
            late_penalty: 90,
            rate_change: 80,
            partial_payment: 60,
            extra_payment: 30,
            skip_payment: 20,
        }
    }
}

impl EngineConfig {
    /// load from json, missing sections fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// penalty based on the real annuity payment instead of principal / months
    pub fn with_amortized_skip_penalty(mut self) -> Self {
        self.skip_policy.penalty_base = SkipPenaltyBase::AmortizedPayment;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.precision.output > self.precision.internal {
            return Err(AmortizationError::InvalidConfiguration {
                message: format!(
                    "output precision {} exceeds internal precision {}",
                    self.precision.output, self.precision.internal
                ),
            });
        }
        if self.skip_policy.penalty_rate < Decimal::ZERO {
            return Err(AmortizationError::InvalidConfiguration {
                message: "skip penalty rate must not be negative".to_string(),
            });
        }
        if self.skip_policy.max_payments == 0 || self.holiday_policy.max_months == 0 {
            return Err(AmortizationError::InvalidConfiguration {
                message: "skip and holiday limits must be at least one".to_string(),
            });
        }
        if self.arrears_policy.clearance_tolerance.is_negative() {
            return Err(AmortizationError::InvalidConfiguration {
                message: "clearance tolerance must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.precision.internal, 10);
        assert_eq!(config.precision.output, 2);
        assert_eq!(config.skip_policy.penalty_rate, dec!(0.02));
        assert_eq!(config.skip_policy.max_payments, 12);
        assert_eq!(config.arrears_policy.clearance_tolerance, Money::from_minor(1));
        assert_eq!(config.priorities.arrears_payment, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "skip_policy": { "max_payments": 6, "penalty_base": "amortized_payment" } }"#;
        let config = EngineConfig::from_json(json).unwrap();

        assert_eq!(config.skip_policy.max_payments, 6);
        assert_eq!(config.skip_policy.penalty_base, SkipPenaltyBase::AmortizedPayment);
        assert_eq!(config.skip_policy.penalty_rate, dec!(0.02));
        assert_eq!(config.holiday_policy.max_months, 12);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default().with_amortized_skip_penalty();
        let restored = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_rejects_bad_config() {
        let json = r#"{ "precision": { "internal": 2, "output": 4 } }"#;
        assert!(matches!(
            EngineConfig::from_json(json),
            Err(AmortizationError::InvalidConfiguration { .. })
        ));
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
