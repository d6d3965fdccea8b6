/// event replay - apply a borrower's history to a loan and print the resulting state
use chrono::{NaiveDate, TimeZone, Utc};
use loan_amortization_rs::{
    AmortizationEngine, InMemoryLoanRepository, Loan, LoanEvent, LoanRepository, Money, Rate, RawLoanEvent,
    SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== event replay example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    let mut engine = AmortizationEngine::default();
    let mut repo = InMemoryLoanRepository::new();

    let mut loan = engine.originate(
        Loan::builder()
            .principal(Money::from_major(25_000))
            .annual_rate(Rate::from_percentage(6))
            .months(48)
            .start_date(date(2025, 1, 1)),
        &time,
    )?;
    let loan_id = repo.save(&mut loan)?;
    println!("originated loan {} with {} payments", loan_id, loan.schedule().len());

    // legacy rows as an older store would hand them over
    let stored = vec![
        RawLoanEvent {
            event_type: "partial_payment".to_string(),
            loan_id,
            event_date: date(2025, 1, 31),
            amount: dec!(400),
            notes: None,
        },
        RawLoanEvent {
            event_type: "extra_payment".to_string(),
            loan_id,
            event_date: date(2025, 4, 1),
            amount: dec!(3000),
            notes: Some("reduce_payment".to_string()),
        },
        RawLoanEvent {
            event_type: "skip_payments".to_string(),
            loan_id,
            event_date: date(2025, 7, 1),
            amount: dec!(2),
            notes: None,
        },
        RawLoanEvent {
            event_type: "rate_change".to_string(),
            loan_id,
            event_date: date(2025, 3, 1),
            amount: dec!(6.75),
            notes: None,
        },
    ];

    let events = stored
        .into_iter()
        .map(LoanEvent::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let loan = engine.process_stored(&mut repo, loan_id, events, &time)?;

    println!("\nbalance:  ${}", loan.current_balance());
    println!("term:     {} payments", loan.months());
    println!("arrears:  ${}", loan.total_arrears(Money::CENT));
    println!("rate now: {}", loan.effective_rate(date(2025, 12, 1)));
    println!("snapshots stored: {}", repo.snapshots(loan_id).len());

    println!("\naudit trail:");
    println!("{}", engine.audit().to_json()?);

    // events for another loan are refused
    let stray = LoanEvent::skip_payment(Uuid::new_v4(), date(2025, 8, 1), 1);
    let mut loan = repo.get(loan_id)?;
    if let Err(err) = engine.apply_event(&mut loan, &stray, &time) {
        println!("\nrejected stray event: {}", err);
    }

    Ok(())
}
