pub mod calendar;
pub mod config;
pub mod customer;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod issuance;
pub mod loan;
pub mod payments;
pub mod service;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use config::{IssuancePolicy, LendingConfig, PaymentPolicy};
pub use customer::{Customer, CustomerUpdate};
pub use decimal::{Money, Rate};
pub use errors::{ErrorKind, LoanError, Result};
pub use events::{Event, EventStore};
pub use issuance::{InstallmentSchedule, IssuanceEngine, IssuancePlan, LoanRequest};
pub use loan::{Installment, Loan};
pub use payments::{
    adjust, AdjustmentCalculator, AdjustmentResult, Allocation, PaymentAllocator, PaymentRequest,
    Settlement,
};
pub use service::LoanService;
pub use store::{
    CustomerStore, InMemoryStore, InstallmentStore, LedgerSnapshot, LedgerStore, LoanStore,
};
pub use types::{AdjustmentKind, AllocationStop, CustomerId, InstallmentId, LoanId};
pub use views::{CustomerView, InstallmentView, JsonView, LoanIssued, LoanSummary, PaymentOutcome};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
