use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{CustomerId, InstallmentId, LoanId};

/// loan issued against a customer's credit limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub principal_amount: Money,
    pub interest_rate: Rate,
    /// principal × (1 + rate), unrounded
    pub total_amount: Money,
    pub installment_count: u32,
    pub creation_date: DateTime<Utc>,
    /// true iff every installment is paid
    pub paid: bool,
    pub version: u64,
}

impl Loan {
    pub fn new(
        customer_id: CustomerId,
        principal_amount: Money,
        interest_rate: Rate,
        installment_count: u32,
        creation_date: DateTime<Utc>,
    ) -> Result<Self> {
        let total_amount = principal_amount
            .with_rate(interest_rate)
            .ok_or(LoanError::InvalidPrincipal {
                amount: principal_amount,
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            customer_id,
            principal_amount,
            interest_rate,
            total_amount,
            installment_count,
            creation_date,
            paid: false,
            version: 0,
        })
    }
}

/// one fixed-amount, fixed-due-date obligation of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_amount: Money,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub paid: bool,
    pub version: u64,
}

impl Installment {
    pub fn new(loan_id: LoanId, amount: Money, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            amount,
            paid_amount: Money::ZERO,
            due_date,
            payment_date: None,
            paid: false,
            version: 0,
        }
    }

    /// settle the installment; a paid installment is never touched again
    pub fn settle(&mut self, paid_amount: Money, payment_date: NaiveDate) -> bool {
        if self.paid {
            return false;
        }
        self.paid = true;
        self.paid_amount = paid_amount;
        self.payment_date = Some(payment_date);
        true
    }
}

/// sort installments by due date; stable, so equal dates keep their input order
pub fn sort_by_due_date(installments: &mut [Installment]) {
    installments.sort_by_key(|i| i.due_date);
}

/// true iff every installment in the schedule is paid
pub fn schedule_fully_paid(installments: &[Installment]) -> bool {
    installments.iter().all(|i| i.paid)
}
