use rust_decimal::Decimal;

use crate::decimal::{DecimalMath, Money, Rate};
use crate::errors::{AmortizationError, Result};
use crate::types::PaymentFrequency;

/// fixed periodic payment from the annuity (PMT) formula
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentCalculator {
    math: DecimalMath,
}

impl PaymentCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(precision: u32) -> Self {
        Self {
            math: DecimalMath::new(precision),
        }
    }

    /// payment that amortizes `principal` to zero over `number_of_payments`
    pub fn calculate(
        &self,
        principal: Money,
        annual_rate: Rate,
        frequency: PaymentFrequency,
        number_of_payments: u32,
    ) -> Result<Money> {
        self.calculate_with_balloon(principal, annual_rate, frequency, number_of_payments, Money::ZERO)
    }

    /// payment that amortizes `principal` down to `balloon` over `number_of_payments`
    pub fn calculate_with_balloon(
        &self,
        principal: Money,
        annual_rate: Rate,
        frequency: PaymentFrequency,
        number_of_payments: u32,
        balloon: Money,
    ) -> Result<Money> {
        if !principal.is_positive() {
            return Err(AmortizationError::invalid(format!(
                "principal must be positive, got {}",
                principal
            )));
        }
        if number_of_payments == 0 {
            return Err(AmortizationError::invalid("number of payments must be positive"));
        }
        if annual_rate.is_negative() {
            return Err(AmortizationError::invalid(format!(
                "interest rate must not be negative, got {}",
                annual_rate
            )));
        }
        if balloon.is_negative() || balloon >= principal {
            return Err(AmortizationError::invalid(format!(
                "balloon {} must be at least zero and below principal {}",
                balloon, principal
            )));
        }

        let n = Decimal::from(number_of_payments);

        if annual_rate.is_zero() {
            // straight-line
            let payment = self.math.divide((principal - balloon).as_decimal(), n)?;
            return Ok(Money::from_decimal(payment).round_currency());
        }

        // PMT = r * (P - B * (1 + r)^-n) / (1 - (1 + r)^-n)
        let r = annual_rate.per_period(frequency.periods_per_year()).as_decimal();
        let discount = self.math.power(Decimal::ONE + r, -i64::from(number_of_payments))?;
        let financed = principal.as_decimal() - balloon.as_decimal() * discount;
        let numerator = self.math.multiply(r, financed);
        let denominator = self.math.subtract(Decimal::ONE, discount);
        let payment = self.math.divide(numerator, denominator)?;

        Ok(Money::from_decimal(payment).round_currency())
    }

    /// periods per year for a frequency name, case-insensitive
    pub fn periods_per_year(frequency: &str) -> Result<u32> {
        Ok(frequency.parse::<PaymentFrequency>()?.periods_per_year())
    }

    /// calendar days between payments for a frequency name
    pub fn payment_interval_days(frequency: &str) -> Result<u32> {
        Ok(frequency.parse::<PaymentFrequency>()?.payment_interval_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thirty_year_mortgage() {
        let payment = PaymentCalculator::new()
            .calculate(Money::from_major(100_000), Rate::from_percent(dec!(5.0)), PaymentFrequency::Monthly, 360)
            .unwrap();
        assert_eq!(payment, Money::from_str_exact("536.82").unwrap());
    }

    #[test]
    fn test_short_loan() {
        let payment = PaymentCalculator::new()
            .calculate(Money::from_major(100_000), Rate::from_percentage(12), PaymentFrequency::Monthly, 12)
            .unwrap();
        assert_eq!(payment, Money::from_str_exact("8884.88").unwrap());
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let payment = PaymentCalculator::new()
            .calculate(Money::from_major(12_000), Rate::ZERO, PaymentFrequency::Monthly, 12)
            .unwrap();
        assert_eq!(payment, Money::from_major(1_000));

        let uneven = PaymentCalculator::new()
            .calculate(Money::from_major(100), Rate::ZERO, PaymentFrequency::Weekly, 3)
            .unwrap();
        assert_eq!(uneven, Money::from_str_exact("33.33").unwrap());
    }

    #[test]
    fn test_balloon_lowers_payment() {
        let calc = PaymentCalculator::new();
        let rate = Rate::from_percentage(6);
        let full = calc
            .calculate(Money::from_major(50_000), rate, PaymentFrequency::Monthly, 60)
            .unwrap();
        let balloon = calc
            .calculate_with_balloon(Money::from_major(50_000), rate, PaymentFrequency::Monthly, 60, Money::from_major(20_000))
            .unwrap();
        assert!(balloon < full);
        assert!(calc
            .calculate_with_balloon(Money::from_major(50_000), rate, PaymentFrequency::Monthly, 60, Money::from_major(50_000))
            .is_err());
    }

    #[test]
    fn test_rejects_invalid_arguments() {
        let calc = PaymentCalculator::new();
        let rate = Rate::from_percentage(5);
        assert!(matches!(
            calc.calculate(Money::ZERO, rate, PaymentFrequency::Monthly, 12),
            Err(AmortizationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            calc.calculate(Money::from_major(-5), rate, PaymentFrequency::Monthly, 12),
            Err(AmortizationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            calc.calculate(Money::from_major(1_000), rate, PaymentFrequency::Monthly, 0),
            Err(AmortizationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_frequency_lookups() {
        assert_eq!(PaymentCalculator::periods_per_year("MONTHLY").unwrap(), 12);
        assert_eq!(PaymentCalculator::periods_per_year("semiannual").unwrap(), 2);
        assert_eq!(PaymentCalculator::payment_interval_days("biweekly").unwrap(), 14);
        assert!(matches!(
            PaymentCalculator::periods_per_year("quarterly"),
            Err(AmortizationError::InvalidArgument { .. })
        ));
    }
}
