pub mod memory;

use crate::customer::Customer;
use crate::errors::Result;
use crate::loan::{Installment, Loan};
use crate::types::{CustomerId, LoanId};

pub use memory::{InMemoryStore, LedgerSnapshot};

/// persistence of customer records
///
/// every save is optimistic: the record must carry the version it was read at,
/// and the store answers with the version it now holds.
pub trait CustomerStore {
    fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    fn find_all_customers(&self) -> Result<Vec<Customer>>;

    fn save_customer(&self, customer: &Customer) -> Result<u64>;

    /// remove a customer that owns no loans
    fn delete_customer(&self, id: CustomerId) -> Result<Customer>;
}

/// persistence of loan headers
pub trait LoanStore {
    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>>;

    /// loans of one customer, oldest first
    fn find_loans_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>>;

    fn find_all_loans(&self) -> Result<Vec<Loan>>;

    fn save_loan(&self, loan: &Loan) -> Result<u64>;
}

/// persistence of installment schedules
pub trait InstallmentStore {
    /// installments of one loan in the order they were scheduled
    fn find_installments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>>;

    fn save_installment(&self, installment: &Installment) -> Result<u64>;
}

/// full ledger, able to commit a loan issuance as one unit
pub trait LedgerStore: CustomerStore + LoanStore + InstallmentStore + Send + Sync {
    /// persist the updated customer, the new loan and its schedule together
    ///
    /// either all records are written or none are.
    fn commit_issuance(
        &self,
        customer: &Customer,
        loan: &Loan,
        installments: &[Installment],
    ) -> Result<()>;
}
