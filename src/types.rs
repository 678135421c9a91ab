use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment
pub type InstallmentId = Uuid;

/// why a payment allocation pass stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStop {
    /// every installment of the loan is paid
    ScheduleExhausted,
    /// next unpaid installment is due after the payable horizon
    OutsidePayableWindow,
    /// remaining funds do not cover the next adjusted amount
    InsufficientFunds,
    /// another writer paid the next installment first
    ConcurrentPayment,
}

/// direction of a time-based installment adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    /// paid before the due date
    EarlyDiscount,
    /// paid on the due date
    OnTime,
    /// paid after the due date
    LatePenalty,
}
