use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::customer::Customer;
use crate::errors::{LoanError, Result};
use crate::loan::{Installment, Loan};
use crate::types::{CustomerId, LoanId};

use super::{CustomerStore, InstallmentStore, LedgerStore, LoanStore};

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    loans: HashMap<LoanId, Loan>,
    /// schedule per loan, in generation order
    installments: HashMap<LoanId, Vec<Installment>>,
}

/// thread-safe in-process ledger
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

/// serializable copy of the whole ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub customers: Vec<Customer>,
    pub loans: Vec<Loan>,
    pub installments: Vec<Installment>,
}

impl LedgerSnapshot {
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// version the record gets once saved over `stored`
fn next_version(entity: &'static str, id: Uuid, stored: Option<u64>, incoming: u64) -> Result<u64> {
    match stored {
        Some(found) if found == incoming => Ok(incoming + 1),
        Some(found) => Err(LoanError::ConcurrentModification {
            entity,
            id,
            expected: incoming,
            found,
        }),
        None if incoming == 0 => Ok(1),
        // read once, deleted since
        None => Err(LoanError::ConcurrentModification {
            entity,
            id,
            expected: incoming,
            found: 0,
        }),
    }
}

fn store_error(message: impl Into<String>) -> LoanError {
    LoanError::Store {
        message: message.into(),
    }
}

impl Tables {
    fn check_username(&self, customer: &Customer) -> Result<()> {
        let taken = self
            .customers
            .values()
            .any(|c| c.id != customer.id && c.username == customer.username);
        if taken {
            return Err(LoanError::DuplicateUsername {
                username: customer.username.clone(),
            });
        }
        Ok(())
    }

    fn customer_version(&self, customer: &Customer) -> Result<u64> {
        self.check_username(customer)?;
        let stored = self.customers.get(&customer.id).map(|c| c.version);
        next_version("customer", customer.id, stored, customer.version)
    }

    fn installment_slot(&self, installment: &Installment) -> Result<(Option<usize>, u64)> {
        let schedule = self.installments.get(&installment.loan_id).ok_or_else(|| {
            store_error(format!(
                "installment {} references unknown loan {}",
                installment.id, installment.loan_id
            ))
        })?;
        let index = schedule.iter().position(|i| i.id == installment.id);
        let stored = index.map(|idx| schedule[idx].version);
        let version = next_version("installment", installment.id, stored, installment.version)?;
        Ok((index, version))
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// copy out every record, ordered for stable output
    pub fn snapshot(&self) -> LedgerSnapshot {
        let tables = self.tables.read();

        let mut customers: Vec<_> = tables.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.username.cmp(&b.username));

        let mut loans: Vec<_> = tables.loans.values().cloned().collect();
        loans.sort_by_key(|l| (l.creation_date, l.id));

        let installments = loans
            .iter()
            .flat_map(|l| tables.installments.get(&l.id).cloned().unwrap_or_default())
            .collect();

        LedgerSnapshot {
            customers,
            loans,
            installments,
        }
    }

    /// rebuild a store from a snapshot, rejecting dangling references
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        let mut tables = Tables::default();

        for customer in snapshot.customers {
            tables.check_username(&customer)?;
            tables.customers.insert(customer.id, customer);
        }

        for loan in snapshot.loans {
            if !tables.customers.contains_key(&loan.customer_id) {
                return Err(store_error(format!(
                    "loan {} references unknown customer {}",
                    loan.id, loan.customer_id
                )));
            }
            tables.installments.entry(loan.id).or_default();
            tables.loans.insert(loan.id, loan);
        }

        for installment in snapshot.installments {
            let schedule = tables.installments.get_mut(&installment.loan_id).ok_or_else(|| {
                store_error(format!(
                    "installment {} references unknown loan {}",
                    installment.id, installment.loan_id
                ))
            })?;
            schedule.push(installment);
        }

        debug!(
            customers = tables.customers.len(),
            loans = tables.loans.len(),
            "restored ledger from snapshot"
        );

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

impl CustomerStore for InMemoryStore {
    fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().customers.get(&id).cloned())
    }

    fn find_all_customers(&self) -> Result<Vec<Customer>> {
        let mut customers: Vec<_> = self.tables.read().customers.values().cloned().collect();
        customers.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(customers)
    }

    fn save_customer(&self, customer: &Customer) -> Result<u64> {
        let mut tables = self.tables.write();
        let version = tables.customer_version(customer)?;
        let mut stored = customer.clone();
        stored.version = version;
        tables.customers.insert(stored.id, stored);
        Ok(version)
    }

    fn delete_customer(&self, id: CustomerId) -> Result<Customer> {
        let mut tables = self.tables.write();
        if !tables.customers.contains_key(&id) {
            return Err(LoanError::CustomerNotFound { id });
        }
        let loans = tables.loans.values().filter(|l| l.customer_id == id).count();
        if loans > 0 {
            return Err(LoanError::CustomerHasLoans { id, loans });
        }
        tables
            .customers
            .remove(&id)
            .ok_or(LoanError::CustomerNotFound { id })
    }
}

impl LoanStore for InMemoryStore {
    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.tables.read().loans.get(&id).cloned())
    }

    fn find_loans_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let mut loans: Vec<_> = self
            .tables
            .read()
            .loans
            .values()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| (l.creation_date, l.id));
        Ok(loans)
    }

    fn find_all_loans(&self) -> Result<Vec<Loan>> {
        let mut loans: Vec<_> = self.tables.read().loans.values().cloned().collect();
        loans.sort_by_key(|l| (l.creation_date, l.id));
        Ok(loans)
    }

    fn save_loan(&self, loan: &Loan) -> Result<u64> {
        let mut tables = self.tables.write();
        if !tables.customers.contains_key(&loan.customer_id) {
            return Err(LoanError::CustomerNotFound {
                id: loan.customer_id,
            });
        }
        let stored = tables.loans.get(&loan.id).map(|l| l.version);
        let version = next_version("loan", loan.id, stored, loan.version)?;
        let mut record = loan.clone();
        record.version = version;
        tables.installments.entry(record.id).or_default();
        tables.loans.insert(record.id, record);
        Ok(version)
    }
}

impl InstallmentStore for InMemoryStore {
    fn find_installments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        Ok(self
            .tables
            .read()
            .installments
            .get(&loan_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_installment(&self, installment: &Installment) -> Result<u64> {
        let mut tables = self.tables.write();
        let (index, version) = tables.installment_slot(installment)?;
        let mut record = installment.clone();
        record.version = version;

        let schedule = tables.installments.entry(record.loan_id).or_default();
        match index {
            Some(idx) => schedule[idx] = record,
            None => schedule.push(record),
        }
        Ok(version)
    }
}

impl LedgerStore for InMemoryStore {
    fn commit_issuance(
        &self,
        customer: &Customer,
        loan: &Loan,
        installments: &[Installment],
    ) -> Result<()> {
        let mut tables = self.tables.write();

        // all checks first; nothing below may fail once writing starts
        if !tables.customers.contains_key(&customer.id) {
            return Err(LoanError::CustomerNotFound { id: customer.id });
        }
        let customer_version = tables.customer_version(customer)?;

        if loan.customer_id != customer.id {
            return Err(store_error(format!(
                "loan {} belongs to customer {}, not {}",
                loan.id, loan.customer_id, customer.id
            )));
        }
        if tables.loans.contains_key(&loan.id) {
            return Err(store_error(format!("loan {} already exists", loan.id)));
        }
        if let Some(stray) = installments.iter().find(|i| i.loan_id != loan.id) {
            return Err(store_error(format!(
                "installment {} does not belong to loan {}",
                stray.id, loan.id
            )));
        }

        let mut customer = customer.clone();
        customer.version = customer_version;
        tables.customers.insert(customer.id, customer);

        let mut loan = loan.clone();
        loan.version = 1;
        let schedule = installments
            .iter()
            .cloned()
            .map(|mut i| {
                i.version = 1;
                i
            })
            .collect();
        tables.installments.insert(loan.id, schedule);
        tables.loans.insert(loan.id, loan);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    fn customer(username: &str) -> Customer {
        Customer::new(username, "Ayse", "Demir", Money::from_major(50_000)).unwrap()
    }

    fn loan_for(customer: &Customer) -> (Loan, Vec<Installment>) {
        let loan = Loan::new(
            customer.id,
            Money::from_major(1_000),
            Rate::from_decimal(dec!(0.2)),
            6,
            Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let installments = (2..=7)
            .map(|m| {
                Installment::new(
                    loan.id,
                    Money::from_major(200),
                    NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
                )
            })
            .collect();
        (loan, installments)
    }

    #[test]
    fn test_save_bumps_version() {
        let store = InMemoryStore::new();
        let mut c = customer("ayse");
        assert_eq!(store.save_customer(&c).unwrap(), 1);

        c.version = 1;
        c.name = "Ayşe".to_string();
        assert_eq!(store.save_customer(&c).unwrap(), 2);

        let stored = store.find_customer(c.id).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.name, "Ayşe");
    }

    #[test]
    fn test_stale_save_is_rejected() {
        let store = InMemoryStore::new();
        let c = customer("ayse");
        store.save_customer(&c).unwrap();

        let mut first = store.find_customer(c.id).unwrap().unwrap();
        let mut second = first.clone();
        first.used_credit_limit = Money::from_major(100);
        second.used_credit_limit = Money::from_major(200);

        store.save_customer(&first).unwrap();
        let err = store.save_customer(&second).unwrap_err();
        assert!(matches!(
            err,
            LoanError::ConcurrentModification { entity: "customer", expected: 1, found: 2, .. }
        ));
        assert_eq!(
            store.find_customer(c.id).unwrap().unwrap().used_credit_limit,
            Money::from_major(100)
        );
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = InMemoryStore::new();
        store.save_customer(&customer("ayse")).unwrap();
        let err = store.save_customer(&customer("ayse")).unwrap_err();
        assert_eq!(
            err,
            LoanError::DuplicateUsername {
                username: "ayse".to_string()
            }
        );
    }

    #[test]
    fn test_commit_issuance_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let c = customer("ayse");
        store.save_customer(&c).unwrap();

        // planned against version 0, store already holds version 1
        let mut stale = c.clone();
        stale.used_credit_limit = Money::from_major(1_200);
        let (loan, installments) = loan_for(&stale);

        assert!(store.commit_issuance(&stale, &loan, &installments).is_err());
        assert!(store.find_loan(loan.id).unwrap().is_none());
        assert!(store.find_installments_by_loan(loan.id).unwrap().is_empty());
        assert!(store.find_customer(c.id).unwrap().unwrap().used_credit_limit.is_zero());

        let mut fresh = store.find_customer(c.id).unwrap().unwrap();
        fresh.used_credit_limit = Money::from_major(1_200);
        store.commit_issuance(&fresh, &loan, &installments).unwrap();
        assert_eq!(store.find_loans_by_customer(c.id).unwrap().len(), 1);
        assert_eq!(store.find_installments_by_loan(loan.id).unwrap().len(), 6);
        assert_eq!(
            store.find_customer(c.id).unwrap().unwrap().used_credit_limit,
            Money::from_major(1_200)
        );
    }

    #[test]
    fn test_installment_saves_are_versioned() {
        let store = InMemoryStore::new();
        let c = customer("ayse");
        store.save_customer(&c).unwrap();
        let c = store.find_customer(c.id).unwrap().unwrap();
        let (loan, installments) = loan_for(&c);
        store.commit_issuance(&c, &loan, &installments).unwrap();

        let schedule = store.find_installments_by_loan(loan.id).unwrap();
        let mut a = schedule[0].clone();
        let mut b = schedule[0].clone();
        let day = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        a.settle(Money::from_major(198), day);
        b.settle(Money::from_major(198), day);

        assert_eq!(store.save_installment(&a).unwrap(), 2);
        assert!(matches!(
            store.save_installment(&b),
            Err(LoanError::ConcurrentModification { entity: "installment", .. })
        ));
        // order of the schedule is preserved
        let schedule = store.find_installments_by_loan(loan.id).unwrap();
        assert_eq!(schedule[0].id, a.id);
        assert!(schedule[0].paid);
    }

    #[test]
    fn test_delete_refused_while_loans_exist() {
        let store = InMemoryStore::new();
        let c = customer("ayse");
        store.save_customer(&c).unwrap();
        let c = store.find_customer(c.id).unwrap().unwrap();
        let (loan, installments) = loan_for(&c);
        store.commit_issuance(&c, &loan, &installments).unwrap();

        assert_eq!(
            store.delete_customer(c.id).unwrap_err(),
            LoanError::CustomerHasLoans { id: c.id, loans: 1 }
        );

        let lonely = customer("mert");
        store.save_customer(&lonely).unwrap();
        assert_eq!(store.delete_customer(lonely.id).unwrap().id, lonely.id);
        assert!(store.find_customer(lonely.id).unwrap().is_none());
        assert!(matches!(
            store.delete_customer(lonely.id),
            Err(LoanError::CustomerNotFound { .. })
        ));
    }

    #[test]
    fn test_snapshot_restores_through_json() {
        let store = InMemoryStore::new();
        let c = customer("ayse");
        store.save_customer(&c).unwrap();
        let c = store.find_customer(c.id).unwrap().unwrap();
        let (loan, installments) = loan_for(&c);
        store.commit_issuance(&c, &loan, &installments).unwrap();

        let json = store.snapshot().to_json_pretty().unwrap();
        let restored = InMemoryStore::from_snapshot(LedgerSnapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(
            restored.find_loan(loan.id).unwrap().unwrap().total_amount,
            Money::from_major(1_200)
        );
    }

    #[test]
    fn test_snapshot_with_dangling_loan_rejected() {
        let c = customer("ayse");
        let (loan, _) = loan_for(&c);
        let snapshot = LedgerSnapshot {
            customers: Vec::new(),
            loans: vec![loan],
            installments: Vec::new(),
        };
        assert!(matches!(
            InMemoryStore::from_snapshot(snapshot),
            Err(LoanError::Store { .. })
        ));
    }

    #[test]
    fn test_only_one_concurrent_writer_wins() {
        let store = Arc::new(InMemoryStore::new());
        let c = customer("ayse");
        store.save_customer(&c).unwrap();
        let base = store.find_customer(c.id).unwrap().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                let mut copy = base.clone();
                thread::spawn(move || {
                    copy.used_credit_limit = Money::from_major(n + 1);
                    store.save_customer(&copy).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(store.find_customer(c.id).unwrap().unwrap().version, 2);
    }
}
