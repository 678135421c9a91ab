/// quick start - issue a loan and pay the first installment
use installment_loans_rs::{
    JsonView, LendingConfig, LoanService, Money, Rate, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let service = LoanService::in_memory(LendingConfig::default(), time)?;

    // customer with a 50,000 credit limit
    let customer = service.register_customer("ayse", "Ayse", "Yilmaz", Money::from_major(50_000))?;

    // 10,000 at 20% over 12 installments
    let issued = service.issue_loan(customer.id, Money::from_major(10_000), Rate::from_percentage(20), 12)?;
    println!("{}", issued.to_json_pretty()?);

    // pay enough to cover the first installment
    let outcome = service.pay_loan(issued.loan_id, Money::from_major(1_100))?;
    println!("{}", outcome.to_json_pretty()?);

    Ok(())
}
