use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AllocationStop, CustomerId, InstallmentId, LoanId};

/// all events that can be emitted by the loan service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // customer events
    CustomerRegistered {
        customer_id: CustomerId,
        username: String,
        credit_limit: Money,
    },
    CustomerUpdated {
        customer_id: CustomerId,
        credit_limit: Money,
        used_credit_limit: Money,
    },
    CustomerRemoved {
        customer_id: CustomerId,
    },

    // issuance events
    LoanIssued {
        loan_id: LoanId,
        customer_id: CustomerId,
        principal_amount: Money,
        total_amount: Money,
        installment_count: u32,
        timestamp: DateTime<Utc>,
    },
    CreditReserved {
        customer_id: CustomerId,
        amount: Money,
        used_credit_limit: Money,
    },

    // payment events
    InstallmentPaid {
        loan_id: LoanId,
        installment_id: InstallmentId,
        due_date: NaiveDate,
        scheduled_amount: Money,
        paid_amount: Money,
        payment_date: NaiveDate,
    },
    PaymentApplied {
        loan_id: LoanId,
        offered_amount: Money,
        installments_paid: u32,
        total_amount_paid: Money,
        stop: AllocationStop,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
