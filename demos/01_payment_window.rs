/// payment window - controlled time, early discounts and late penalties
use chrono::{Duration, TimeZone, Utc};
use installment_loans_rs::{LendingConfig, LoanService, Money, Rate, SafeTimeProvider, TimeSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment window example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 11, 24, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let service = LoanService::in_memory(LendingConfig::default(), time.clone())?;
    let customer = service.register_customer("mert", "Mert", "Demir", Money::from_major(20_000))?;
    let issued = service.issue_loan(customer.id, Money::from_major(6_000), Rate::from_percentage(20), 6)?;
    println!("issued on {}: {} x {}", time.now().format("%Y-%m-%d"), issued.installment_count, issued.installment_amount);

    // only installments due up to the first of the month three months out can be paid
    let outcome = service.pay_loan(issued.loan_id, Money::from_major(10_000))?;
    println!(
        "paid {} installments for {} (discount {}), stopped: {:?}",
        outcome.installments_paid, outcome.total_amount_paid, outcome.total_discount, outcome.stop
    );

    // skip ahead past the next due date
    controller.advance(Duration::days(110));
    println!("\nadvanced to: {}", time.now().format("%Y-%m-%d"));

    let outcome = service.pay_loan(issued.loan_id, Money::from_major(10_000))?;
    println!(
        "paid {} installments for {} (discount {}, penalty {}), fully paid: {}",
        outcome.installments_paid,
        outcome.total_amount_paid,
        outcome.total_discount,
        outcome.total_penalty,
        outcome.loan_fully_paid
    );

    println!("\nschedule:");
    for installment in service.installments(issued.loan_id)? {
        println!(
            "  due {}  amount {}  paid {}  on {}",
            installment.due_date,
            installment.amount,
            installment.paid_amount,
            installment.payment_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}
