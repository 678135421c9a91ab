//! serializable response shapes handed to the calling layer
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::customer::Customer;
use crate::decimal::{Money, Rate};
use crate::loan::{Installment, Loan};
use crate::payments::Settlement;
use crate::types::{AllocationStop, CustomerId, InstallmentId, LoanId};

/// json rendering shared by every view
pub trait JsonView: Serialize {
    fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// result of a successful issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanIssued {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub installment_amount: Money,
    pub installment_count: u32,
    pub paid: bool,
}

/// result of one payment call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub loan_id: LoanId,
    pub installments_paid: u32,
    pub total_amount_paid: Money,
    pub loan_fully_paid: bool,
    pub total_discount: Money,
    pub total_penalty: Money,
    pub stop: AllocationStop,
}

impl PaymentOutcome {
    /// totals over the settlements that were actually committed
    pub fn from_settlements(
        loan_id: LoanId,
        settlements: &[Settlement],
        loan_fully_paid: bool,
        stop: AllocationStop,
    ) -> Self {
        Self {
            loan_id,
            installments_paid: settlements.len() as u32,
            total_amount_paid: settlements.iter().map(|s| s.paid_amount()).sum(),
            loan_fully_paid,
            total_discount: settlements.iter().map(|s| s.adjustment.discount).sum(),
            total_penalty: settlements.iter().map(|s| s.adjustment.penalty).sum(),
            stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub principal_amount: Money,
    pub interest_rate: Rate,
    pub total_amount: Money,
    pub installment_count: u32,
    pub creation_date: DateTime<Utc>,
    pub paid: bool,
}

impl LoanSummary {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            customer_id: loan.customer_id,
            principal_amount: loan.principal_amount,
            interest_rate: loan.interest_rate,
            total_amount: loan.total_amount,
            installment_count: loan.installment_count,
            creation_date: loan.creation_date,
            paid: loan.paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_amount: Money,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub paid: bool,
}

impl InstallmentView {
    pub fn from_installment(installment: &Installment) -> Self {
        Self {
            id: installment.id,
            loan_id: installment.loan_id,
            amount: installment.amount,
            paid_amount: installment.paid_amount,
            due_date: installment.due_date,
            payment_date: installment.payment_date,
            paid: installment.paid,
        }
    }
}

/// customer with credit usage and loan summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub credit_limit: Money,
    pub used_credit_limit: Money,
    pub available_credit: Money,
    pub loans: Vec<LoanSummary>,
}

impl CustomerView {
    pub fn from_customer(customer: &Customer, loans: &[Loan]) -> Self {
        Self {
            id: customer.id,
            username: customer.username.clone(),
            name: customer.name.clone(),
            surname: customer.surname.clone(),
            credit_limit: customer.credit_limit,
            used_credit_limit: customer.used_credit_limit,
            available_credit: customer.available_credit(),
            loans: loans.iter().map(LoanSummary::from_loan).collect(),
        }
    }
}

impl JsonView for LoanIssued {}
impl JsonView for PaymentOutcome {}
impl JsonView for LoanSummary {}
impl JsonView for InstallmentView {}
impl JsonView for CustomerView {}
