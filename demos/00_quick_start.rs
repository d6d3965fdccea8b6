/// quick start - generate a schedule for a five year loan
use chrono::{NaiveDate, TimeZone, Utc};
use loan_amortization_rs::{
    Money, PaymentCalculator, PaymentFrequency, Rate, SafeTimeProvider, ScheduleGenerator, ScheduleRequest,
    ScheduleSummary, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));

    // $10,000 at 5% over 60 monthly payments
    let principal = Money::from_major(10_000);
    let rate = Rate::from_percent(dec!(5.0));

    let payment = PaymentCalculator::new().calculate(principal, rate, PaymentFrequency::Monthly, 60)?;
    println!("monthly payment: ${}", payment);

    let request = ScheduleRequest::new(principal, rate, PaymentFrequency::Monthly, 60)
        .starting(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    let rows = ScheduleGenerator::new().generate(&request, &time)?;

    println!("\n  #  date         payment   interest  principal    balance");
    for row in rows.iter().take(6) {
        println!(
            "{:>3}  {}  {:>9}  {:>9}  {:>9}  {:>9}",
            row.payment_number,
            row.payment_date,
            row.payment_amount.round_currency(),
            row.interest_amount.round_currency(),
            row.principal_amount.round_currency(),
            row.remaining_balance.round_currency(),
        );
    }
    println!("  ...");

    let summary = ScheduleSummary::from_rows(&rows);
    println!("\ntotal paid:     ${}", summary.total_payments);
    println!("total interest: ${}", summary.total_interest);
    println!("final payment:  {:?}", summary.final_payment_date);

    Ok(())
}
