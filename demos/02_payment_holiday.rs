/// payment holiday - defer three payments and resume after the break
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use loan_amortization_rs::{
    AmortizationEngine, InterestHandling, Loan, LoanEvent, Money, Rate, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment holiday example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    let mut engine = AmortizationEngine::default();
    let mut loan = engine.originate(
        Loan::builder()
            .id(Uuid::new_v4())
            .principal(Money::from_major(12_000))
            .annual_rate(Rate::from_percentage(6))
            .months(24)
            .start_date(date(2025, 1, 1)),
        &time,
    )?;

    // pay the first two installments
    engine.record_scheduled_payment(&mut loan, date(2025, 1, 1), &time)?;
    controller.advance(Duration::days(30));
    engine.record_scheduled_payment(&mut loan, date(2025, 1, 31), &time)?;
    println!("after two payments: ${} over {} payments", loan.current_balance(), loan.months());

    controller.advance(Duration::days(30));
    let event = LoanEvent::payment_holiday(
        loan.id().unwrap(),
        time.now().date_naive(),
        3,
        InterestHandling::Deferral,
        "temporary loss of income",
    );
    let mut holiday = engine.grant_holiday(&mut loan, &event, &time)?;
    println!(
        "\nholiday {} active from {} to {}, interest capitalized ${}",
        holiday.id, holiday.start_date, holiday.end_date, holiday.interest_applied
    );
    println!("balance now ${} over {} payments", loan.current_balance(), loan.months());

    let next = loan
        .schedule()
        .iter()
        .find(|row| row.payment_number > loan.payments_made());
    if let Some(row) = next {
        println!("next payment {} of ${} due {}", row.payment_number, row.payment_amount, row.payment_date);
    }

    controller.advance(Duration::days(90));
    let snapshot = engine.complete_holiday(&mut loan, &mut holiday, &time)?;
    println!("\nholiday {:?} on {}", holiday.status, snapshot.timestamp.format("%Y-%m-%d"));
    println!("remaining interest: ${}", snapshot.remaining_schedule().total_interest);

    Ok(())
}
