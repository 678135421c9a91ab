use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("customer not found: {id}")]
    CustomerNotFound {
        id: Uuid,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("invalid installment count: {count}, allowed {allowed:?}")]
    InvalidInstallmentCount {
        count: u32,
        allowed: Vec<u32>,
    },

    #[error("invalid interest rate: {rate}, must lie in [{min}, {max}]")]
    InvalidInterestRate {
        rate: Rate,
        min: Rate,
        max: Rate,
    },

    #[error("invalid principal amount: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("amount out of range: {amount}")]
    AmountOutOfRange {
        amount: Money,
    },

    #[error("insufficient credit limit: available {available}, requested {requested}")]
    InsufficientCredit {
        available: Money,
        requested: Money,
    },

    #[error("username already registered: {username}")]
    DuplicateUsername {
        username: String,
    },

    #[error("customer {id} still owns {loans} loan(s)")]
    CustomerHasLoans {
        id: Uuid,
        loans: usize,
    },

    #[error("invalid customer: {message}")]
    InvalidCustomer {
        message: String,
    },

    #[error("concurrent modification of {entity} {id}: expected version {expected}, found {found}")]
    ConcurrentModification {
        entity: &'static str,
        id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },
}

/// coarse classification the calling layer maps onto a user-facing status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidParameter,
    InsufficientCredit,
    Conflict,
    Internal,
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanError::CustomerNotFound { .. } | LoanError::LoanNotFound { .. } => ErrorKind::NotFound,
            LoanError::InvalidInstallmentCount { .. }
            | LoanError::InvalidInterestRate { .. }
            | LoanError::InvalidPrincipal { .. }
            | LoanError::InvalidPaymentAmount { .. }
            | LoanError::AmountOutOfRange { .. }
            | LoanError::CustomerHasLoans { .. }
            | LoanError::InvalidCustomer { .. } => ErrorKind::InvalidParameter,
            LoanError::InsufficientCredit { .. } => ErrorKind::InsufficientCredit,
            LoanError::DuplicateUsername { .. } | LoanError::ConcurrentModification { .. } => {
                ErrorKind::Conflict
            }
            LoanError::InvalidDate { .. }
            | LoanError::InvalidConfiguration { .. }
            | LoanError::Store { .. } => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
