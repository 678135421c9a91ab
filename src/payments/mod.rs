pub mod adjustment;
pub mod allocation;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::LoanId;

pub use adjustment::{adjust, AdjustmentCalculator, AdjustmentResult, DEFAULT_DAILY_ADJUSTMENT};
pub use allocation::{Allocation, PaymentAllocator, Settlement};

/// payment request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub loan_id: LoanId,
    pub amount: Money,
}

impl PaymentRequest {
    pub fn new(loan_id: LoanId, amount: Money) -> Self {
        Self { loan_id, amount }
    }

    /// zero is allowed and settles nothing; negative amounts are refused
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_negative() {
            return Err(LoanError::InvalidPaymentAmount {
                amount: self.amount,
            });
        }
        Ok(())
    }
}
