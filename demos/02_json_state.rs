/// json state - ledger snapshots and views for debugging
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use installment_loans_rs::{
    InMemoryStore, JsonView, LedgerSnapshot, LendingConfig, LoanService, Money, Rate,
    SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== json state serialization ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    ));

    // configuration can come from json; missing sections keep defaults
    let config = LendingConfig::from_json_str(r#"{ "payment": { "daily_adjustment_rate": "0.0005", "payable_window_months": 2 } }"#)?;

    let store = Arc::new(InMemoryStore::new());
    let service = LoanService::new(Arc::clone(&store), config, time.clone())?;

    let customer = service.register_customer("zeynep", "Zeynep", "Kaya", Money::from_major(30_000))?;
    let issued = service.issue_loan(customer.id, Money::from_major(9_000), Rate::from_percentage(10), 9)?;
    service.pay_loan(issued.loan_id, Money::from_major(1_200))?;

    println!("customer view");
    println!("-------------");
    println!("{}\n", service.customer_view(customer.id)?.to_json_pretty()?);

    // snapshot the whole ledger and restore it into a fresh store
    let json = store.snapshot().to_json_pretty()?;
    println!("ledger snapshot");
    println!("---------------");
    println!("{}\n", json);

    let restored = InMemoryStore::from_snapshot(LedgerSnapshot::from_json(&json)?)?;
    println!("restored snapshot matches: {}", restored.snapshot() == store.snapshot());

    println!("\nevents:");
    for event in service.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
