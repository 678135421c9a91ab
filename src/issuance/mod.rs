pub mod schedule;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::IssuancePolicy;
use crate::customer::Customer;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::loan::{Installment, Loan};
use crate::types::CustomerId;

pub use schedule::InstallmentSchedule;

/// loan request as received from the calling layer
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRequest {
    pub customer_id: CustomerId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
}

/// everything an accepted request changes, ready to be committed as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct IssuancePlan {
    /// customer with the new used credit limit applied
    pub customer: Customer,
    pub loan: Loan,
    pub installment_amount: Money,
    pub installments: Vec<Installment>,
}

/// validates loan requests and prices them into a loan plus installment schedule
pub struct IssuanceEngine<'a> {
    policy: &'a IssuancePolicy,
}

impl<'a> IssuanceEngine<'a> {
    pub fn new(policy: &'a IssuancePolicy) -> Self {
        Self { policy }
    }

    /// parameter checks that do not need the customer record
    pub fn validate(&self, request: &LoanRequest) -> Result<()> {
        if !self.policy.allows_installment_count(request.installment_count) {
            return Err(LoanError::InvalidInstallmentCount {
                count: request.installment_count,
                allowed: self.policy.allowed_installment_counts.clone(),
            });
        }

        if !self.policy.allows_interest_rate(request.interest_rate) {
            return Err(LoanError::InvalidInterestRate {
                rate: request.interest_rate,
                min: self.policy.min_interest_rate,
                max: self.policy.max_interest_rate,
            });
        }

        if !request.principal.is_positive() {
            return Err(LoanError::InvalidPrincipal {
                amount: request.principal,
            });
        }

        Ok(())
    }

    /// price the request against the customer's current credit usage
    ///
    /// nothing is mutated on failure; the returned plan holds an updated copy
    /// of the customer.
    pub fn plan(
        &self,
        customer: &Customer,
        request: &LoanRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuancePlan> {
        self.validate(request)?;

        let loan = Loan::new(
            customer.id,
            request.principal,
            request.interest_rate,
            request.installment_count,
            now,
        )?;
        debug!(
            customer_id = %customer.id,
            principal = %request.principal,
            total_amount = %loan.total_amount,
            "priced loan request"
        );

        let mut customer = customer.clone();
        customer.reserve_credit(loan.total_amount)?;

        let schedule = InstallmentSchedule::generate(
            loan.id,
            loan.total_amount,
            loan.installment_count,
            now.date_naive(),
        )?;
        debug!(
            loan_id = %loan.id,
            installment_amount = %schedule.installment_amount,
            drift = ?schedule.rounding_drift(),
            "generated installment schedule"
        );

        Ok(IssuancePlan {
            customer,
            installment_amount: schedule.installment_amount,
            installments: schedule.into_installments(),
            loan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn customer(limit: i64, used: i64) -> Customer {
        let mut c = Customer::new("mehmet", "Mehmet", "Kaya", Money::from_major(limit)).unwrap();
        c.used_credit_limit = Money::from_major(used);
        c
    }

    fn request(customer_id: CustomerId, principal: Decimal, rate: Decimal, count: u32) -> LoanRequest {
        LoanRequest {
            customer_id,
            principal: Money::from_decimal(principal),
            interest_rate: Rate::from_decimal(rate),
            installment_count: count,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 24, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_plan_prices_loan_and_reserves_credit() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let c = customer(50_000, 0);

        let plan = engine
            .plan(&c, &request(c.id, dec!(10000), dec!(0.2), 12), now())
            .unwrap();

        assert_eq!(plan.loan.total_amount, Money::from_major(12_000));
        assert_eq!(plan.installment_amount, Money::from_major(1_000));
        assert_eq!(plan.installments.len(), 12);
        assert_eq!(plan.customer.used_credit_limit, Money::from_major(12_000));
        assert_eq!(plan.loan.customer_id, c.id);
        assert_eq!(plan.loan.creation_date, now());
        assert!(!plan.loan.paid);
        assert_eq!(
            plan.installments[0].due_date,
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
        assert!(plan.installments.iter().all(|i| i.loan_id == plan.loan.id));
        // the caller's copy is untouched
        assert_eq!(c.used_credit_limit, Money::ZERO);
    }

    #[test]
    fn test_installment_counts_outside_set_rejected() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let id = Uuid::new_v4();

        for count in [0u32, 1, 5, 7, 10, 11, 13, 18, 36] {
            let err = engine
                .validate(&request(id, dec!(1000), dec!(0.2), count))
                .unwrap_err();
            assert!(matches!(err, LoanError::InvalidInstallmentCount { .. }), "count {}", count);
        }
        for count in [6u32, 9, 12, 24] {
            assert!(engine.validate(&request(id, dec!(1000), dec!(0.2), count)).is_ok());
        }
    }

    #[test]
    fn test_installment_count_checked_before_anything_else() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let err = engine
            .validate(&request(Uuid::new_v4(), dec!(-5), dec!(0.9), 10))
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidInstallmentCount { count: 10, .. }));
    }

    #[test]
    fn test_interest_rate_bounds_are_inclusive() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let id = Uuid::new_v4();

        for rate in [dec!(0.1), dec!(0.25), dec!(0.5)] {
            assert!(engine.validate(&request(id, dec!(1000), rate, 12)).is_ok());
        }
        for rate in [dec!(0), dec!(0.05), dec!(0.0999), dec!(0.5001), dec!(1)] {
            let err = engine.validate(&request(id, dec!(1000), rate, 12)).unwrap_err();
            assert!(matches!(err, LoanError::InvalidInterestRate { .. }), "rate {}", rate);
        }
    }

    #[test]
    fn test_non_positive_principal_rejected() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        for principal in [dec!(0), dec!(-100)] {
            let err = engine
                .validate(&request(Uuid::new_v4(), principal, dec!(0.2), 12))
                .unwrap_err();
            assert!(matches!(err, LoanError::InvalidPrincipal { .. }));
        }
    }

    #[test]
    fn test_insufficient_credit() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let c = customer(50_000, 12_000);

        let err = engine
            .plan(&c, &request(c.id, dec!(40001), dec!(0.1), 12), now())
            .unwrap_err();
        assert_eq!(
            err,
            LoanError::InsufficientCredit {
                available: Money::from_major(38_000),
                requested: Money::from_decimal(dec!(44001.1)),
            }
        );
    }

    #[test]
    fn test_loan_can_consume_exact_remaining_credit() {
        let policy = IssuancePolicy::default();
        let engine = IssuanceEngine::new(&policy);
        let c = customer(12_000, 0);

        let plan = engine
            .plan(&c, &request(c.id, dec!(10000), dec!(0.2), 6), now())
            .unwrap();
        assert_eq!(plan.customer.used_credit_limit, plan.customer.credit_limit);
        assert_eq!(plan.installment_amount, Money::from_major(2_000));
    }
}
