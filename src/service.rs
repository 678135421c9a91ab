use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::LendingConfig;
use crate::customer::{Customer, CustomerUpdate};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::issuance::{IssuanceEngine, LoanRequest};
use crate::loan::{schedule_fully_paid, sort_by_due_date, Installment, Loan};
use crate::payments::{PaymentAllocator, PaymentRequest, Settlement};
use crate::store::{InMemoryStore, LedgerStore};
use crate::types::{AllocationStop, CustomerId, LoanId};
use crate::views::{CustomerView, InstallmentView, LoanIssued, LoanSummary, PaymentOutcome};

/// one exclusive lock per record id, created on first use
#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id).or_default())
    }

    fn forget(&self, id: Uuid) {
        self.locks.lock().remove(&id);
    }

    #[cfg(test)]
    fn contains(&self, id: Uuid) -> bool {
        self.locks.lock().contains_key(&id)
    }
}

/// loan back office: issuance, payment and customer administration over a ledger store
pub struct LoanService<S: LedgerStore> {
    store: Arc<S>,
    config: LendingConfig,
    time: SafeTimeProvider,
    customer_locks: KeyedLocks,
    loan_locks: KeyedLocks,
    events: Mutex<EventStore>,
}

impl LoanService<InMemoryStore> {
    /// service over a fresh in-memory ledger
    pub fn in_memory(config: LendingConfig, time: SafeTimeProvider) -> Result<Self> {
        Self::new(Arc::new(InMemoryStore::new()), config, time)
    }
}

impl<S: LedgerStore> LoanService<S> {
    pub fn new(store: Arc<S>, config: LendingConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            time,
            customer_locks: KeyedLocks::default(),
            loan_locks: KeyedLocks::default(),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn with_system_time(store: Arc<S>, config: LendingConfig) -> Result<Self> {
        Self::new(store, config, SafeTimeProvider::new(TimeSource::System))
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    /// drain events recorded since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    fn emit(&self, event: Event) {
        self.events.lock().emit(event);
    }

    fn require_customer(&self, id: CustomerId) -> Result<Customer> {
        self.store
            .find_customer(id)?
            .ok_or(LoanError::CustomerNotFound { id })
    }

    fn require_loan(&self, id: LoanId) -> Result<Loan> {
        self.store.find_loan(id)?.ok_or(LoanError::LoanNotFound { id })
    }

    /// issue a loan against the customer's remaining credit
    ///
    /// parameters are checked before the customer is looked up. the customer's
    /// lock is held from the credit check until the loan and its schedule are
    /// committed, so concurrent requests cannot both pass against the same headroom.
    #[instrument(name = "loan.issue", skip(self), err)]
    pub fn issue_loan(
        &self,
        customer_id: CustomerId,
        principal: Money,
        interest_rate: Rate,
        installment_count: u32,
    ) -> Result<LoanIssued> {
        let request = LoanRequest {
            customer_id,
            principal,
            interest_rate,
            installment_count,
        };
        let engine = IssuanceEngine::new(&self.config.issuance);
        engine.validate(&request).map_err(|err| {
            warn!(%err, "loan request rejected");
            err
        })?;

        let lock = self.customer_locks.lock_for(customer_id);
        let _guard = lock.lock();

        let customer = self.require_customer(customer_id)?;
        let now = self.time.now();
        let plan = engine.plan(&customer, &request, now).map_err(|err| {
            warn!(%err, available = %customer.available_credit(), "loan request rejected");
            err
        })?;

        self.store
            .commit_issuance(&plan.customer, &plan.loan, &plan.installments)?;

        info!(
            loan_id = %plan.loan.id,
            total_amount = %plan.loan.total_amount,
            installment_amount = %plan.installment_amount,
            used_credit_limit = %plan.customer.used_credit_limit,
            "loan issued"
        );

        self.emit(Event::CreditReserved {
            customer_id,
            amount: plan.loan.total_amount,
            used_credit_limit: plan.customer.used_credit_limit,
        });
        self.emit(Event::LoanIssued {
            loan_id: plan.loan.id,
            customer_id,
            principal_amount: plan.loan.principal_amount,
            total_amount: plan.loan.total_amount,
            installment_count: plan.loan.installment_count,
            timestamp: now,
        });

        Ok(LoanIssued {
            loan_id: plan.loan.id,
            customer_id,
            total_amount: plan.loan.total_amount,
            installment_amount: plan.installment_amount,
            installment_count: plan.loan.installment_count,
            paid: plan.loan.paid,
        })
    }

    /// apply a payment to a loan's earliest unpaid installments
    ///
    /// an installment is either paid in full at its adjusted amount or left
    /// untouched. allocation stops at the first installment that is outside the
    /// payable window or that the remaining funds cannot cover.
    #[instrument(name = "loan.pay", skip(self), err)]
    pub fn pay_loan(&self, loan_id: LoanId, amount: Money) -> Result<PaymentOutcome> {
        PaymentRequest::new(loan_id, amount).validate().map_err(|err| {
            warn!(%err, "payment rejected");
            err
        })?;

        let result = {
            let lock = self.loan_locks.lock_for(loan_id);
            let _guard = lock.lock();
            self.apply_payment(loan_id, amount)
        };

        // settled and unknown loans keep no lock entry
        match &result {
            Ok(outcome) if outcome.loan_fully_paid => self.loan_locks.forget(loan_id),
            Err(LoanError::LoanNotFound { .. }) => self.loan_locks.forget(loan_id),
            _ => {}
        }
        result
    }

    /// allocate and commit one payment; the caller holds the loan's lock
    fn apply_payment(&self, loan_id: LoanId, amount: Money) -> Result<PaymentOutcome> {
        let loan = self.require_loan(loan_id)?;
        let mut installments = self.store.find_installments_by_loan(loan_id)?;
        sort_by_due_date(&mut installments);

        let now = self.time.now();
        let today = now.date_naive();
        let allocation =
            PaymentAllocator::new(&self.config.payment).allocate(&installments, amount, today)?;

        let (committed, stop) = self.commit_settlements(
            &mut installments,
            allocation.settlements,
            allocation.stop,
            today,
        )?;

        let fully_paid = if stop == AllocationStop::ConcurrentPayment {
            schedule_fully_paid(&self.store.find_installments_by_loan(loan_id)?)
        } else {
            schedule_fully_paid(&installments)
        };
        let settled_now = self.update_paid_flag(loan, fully_paid)?;

        let outcome = PaymentOutcome::from_settlements(loan_id, &committed, fully_paid, stop);
        debug!(
            installments_paid = outcome.installments_paid,
            total_amount_paid = %outcome.total_amount_paid,
            stop = ?stop,
            "payment allocated"
        );

        if !committed.is_empty() {
            info!(
                %loan_id,
                installments_paid = outcome.installments_paid,
                total_amount_paid = %outcome.total_amount_paid,
                loan_fully_paid = fully_paid,
                "payment applied"
            );
            self.emit(Event::PaymentApplied {
                loan_id,
                offered_amount: amount,
                installments_paid: outcome.installments_paid,
                total_amount_paid: outcome.total_amount_paid,
                stop,
                timestamp: now,
            });
        }
        if settled_now {
            info!(%loan_id, "loan settled");
            self.emit(Event::LoanSettled {
                loan_id,
                timestamp: now,
            });
        }

        Ok(outcome)
    }

    /// persist each planned settlement in order, stopping at the first lost race
    fn commit_settlements(
        &self,
        installments: &mut [Installment],
        settlements: Vec<Settlement>,
        planned_stop: AllocationStop,
        today: NaiveDate,
    ) -> Result<(Vec<Settlement>, AllocationStop)> {
        let mut committed = Vec::with_capacity(settlements.len());

        for settlement in settlements {
            let Some(installment) = installments
                .iter_mut()
                .find(|i| i.id == settlement.installment_id)
            else {
                continue;
            };

            let mut updated = installment.clone();
            if !updated.settle(settlement.paid_amount(), today) {
                continue;
            }

            match self.store.save_installment(&updated) {
                Ok(version) => {
                    updated.version = version;
                    *installment = updated;
                }
                Err(err @ LoanError::ConcurrentModification { .. }) => {
                    warn!(%err, installment_id = %settlement.installment_id, "installment paid concurrently");
                    return Ok((committed, AllocationStop::ConcurrentPayment));
                }
                Err(err) => return Err(err),
            }

            self.emit(Event::InstallmentPaid {
                loan_id: installment.loan_id,
                installment_id: installment.id,
                due_date: installment.due_date,
                scheduled_amount: installment.amount,
                paid_amount: installment.paid_amount,
                payment_date: today,
            });
            committed.push(settlement);
        }

        Ok((committed, planned_stop))
    }

    /// save the loan only when its paid flag changes; true if it just became paid
    fn update_paid_flag(&self, mut loan: Loan, fully_paid: bool) -> Result<bool> {
        let was_paid = loan.paid;
        while loan.paid != fully_paid {
            loan.paid = fully_paid;
            match self.store.save_loan(&loan) {
                Ok(version) => loan.version = version,
                Err(LoanError::ConcurrentModification { .. }) => {
                    loan = self.require_loan(loan.id)?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(!was_paid && loan.paid)
    }

    /// register a customer with an empty used credit limit
    #[instrument(name = "loan.register_customer", skip(self), err)]
    pub fn register_customer(
        &self,
        username: &str,
        name: &str,
        surname: &str,
        credit_limit: Money,
    ) -> Result<Customer> {
        let mut customer = Customer::new(username, name, surname, credit_limit)?;
        customer.version = self.store.save_customer(&customer)?;

        info!(customer_id = %customer.id, %credit_limit, "customer registered");
        self.emit(Event::CustomerRegistered {
            customer_id: customer.id,
            username: customer.username.clone(),
            credit_limit,
        });
        Ok(customer)
    }

    #[instrument(name = "loan.customer", skip(self), err)]
    pub fn customer(&self, id: CustomerId) -> Result<Customer> {
        self.require_customer(id)
    }

    #[instrument(name = "loan.customers", skip(self), err)]
    pub fn customers(&self) -> Result<Vec<Customer>> {
        self.store.find_all_customers()
    }

    /// administrative update; used credit must stay within `[0, limit]`
    #[instrument(name = "loan.update_customer", skip(self), err)]
    pub fn update_customer(&self, id: CustomerId, update: CustomerUpdate) -> Result<Customer> {
        let lock = self.customer_locks.lock_for(id);
        let _guard = lock.lock();

        let mut customer = self.require_customer(id)?;
        customer.apply_update(update)?;
        customer.version = self.store.save_customer(&customer)?;

        info!(customer_id = %id, "customer updated");
        self.emit(Event::CustomerUpdated {
            customer_id: id,
            credit_limit: customer.credit_limit,
            used_credit_limit: customer.used_credit_limit,
        });
        Ok(customer)
    }

    /// remove a customer that owns no loans
    #[instrument(name = "loan.remove_customer", skip(self), err)]
    pub fn remove_customer(&self, id: CustomerId) -> Result<Customer> {
        let removed = {
            let lock = self.customer_locks.lock_for(id);
            let _guard = lock.lock();
            self.store.delete_customer(id)?
        };
        self.customer_locks.forget(id);

        info!(customer_id = %id, "customer removed");
        self.emit(Event::CustomerRemoved { customer_id: id });
        Ok(removed)
    }

    #[instrument(name = "loan.loans_for_customer", skip(self), err)]
    pub fn loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<LoanSummary>> {
        self.require_customer(customer_id)?;
        let loans = self.store.find_loans_by_customer(customer_id)?;
        Ok(loans.iter().map(LoanSummary::from_loan).collect())
    }

    #[instrument(name = "loan.all_loans", skip(self), err)]
    pub fn all_loans(&self) -> Result<Vec<LoanSummary>> {
        let loans = self.store.find_all_loans()?;
        Ok(loans.iter().map(LoanSummary::from_loan).collect())
    }

    /// installments of a loan by ascending due date
    #[instrument(name = "loan.installments", skip(self), err)]
    pub fn installments(&self, loan_id: LoanId) -> Result<Vec<InstallmentView>> {
        self.require_loan(loan_id)?;
        let mut installments = self.store.find_installments_by_loan(loan_id)?;
        sort_by_due_date(&mut installments);
        Ok(installments.iter().map(InstallmentView::from_installment).collect())
    }

    #[instrument(name = "loan.customer_view", skip(self), err)]
    pub fn customer_view(&self, id: CustomerId) -> Result<CustomerView> {
        let customer = self.require_customer(id)?;
        let loans = self.store.find_loans_by_customer(id)?;
        Ok(CustomerView::from_customer(&customer, &loans))
    }
}
