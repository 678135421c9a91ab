use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::CustomerId;

/// customer holding a credit limit that loans are issued against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub credit_limit: Money,
    /// principal plus interest of every issued loan; never released
    pub used_credit_limit: Money,
    /// optimistic concurrency token, bumped by the store on every save
    pub version: u64,
}

/// administrative changes to a customer record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub credit_limit: Option<Money>,
    pub used_credit_limit: Option<Money>,
}

impl Customer {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        credit_limit: Money,
    ) -> Result<Self> {
        let customer = Self {
            id: Uuid::new_v4(),
            username: username.into(),
            name: name.into(),
            surname: surname.into(),
            credit_limit,
            used_credit_limit: Money::ZERO,
            version: 0,
        };
        customer.validate()?;
        Ok(customer)
    }

    /// credit still available for new loans
    pub fn available_credit(&self) -> Money {
        (self.credit_limit - self.used_credit_limit).max(Money::ZERO)
    }

    /// used credit limit after reserving `amount`, or an error if it would exceed the limit
    pub fn prospective_usage(&self, amount: Money) -> Result<Money> {
        match self.used_credit_limit.checked_add(amount) {
            Some(prospective) if prospective <= self.credit_limit => Ok(prospective),
            _ => Err(LoanError::InsufficientCredit {
                available: self.available_credit(),
                requested: amount,
            }),
        }
    }

    /// reserve credit for a newly issued loan
    pub fn reserve_credit(&mut self, amount: Money) -> Result<Money> {
        let prospective = self.prospective_usage(amount)?;
        self.used_credit_limit = prospective;
        Ok(prospective)
    }

    /// apply an administrative update; the record is left untouched if the result is invalid
    pub fn apply_update(&mut self, update: CustomerUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(username) = update.username {
            next.username = username;
        }
        if let Some(name) = update.name {
            next.name = name;
        }
        if let Some(surname) = update.surname {
            next.surname = surname;
        }
        if let Some(limit) = update.credit_limit {
            next.credit_limit = limit;
        }
        if let Some(used) = update.used_credit_limit {
            next.used_credit_limit = used;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(LoanError::InvalidCustomer {
                message: "username cannot be empty".to_string(),
            });
        }
        if self.credit_limit.is_negative() {
            return Err(LoanError::InvalidCustomer {
                message: format!("credit limit cannot be negative: {}", self.credit_limit),
            });
        }
        if self.used_credit_limit.is_negative() {
            return Err(LoanError::InvalidCustomer {
                message: format!("used credit limit cannot be negative: {}", self.used_credit_limit),
            });
        }
        if self.used_credit_limit > self.credit_limit {
            return Err(LoanError::InvalidCustomer {
                message: format!(
                    "used credit limit {} exceeds credit limit {}",
                    self.used_credit_limit, self.credit_limit
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn customer(limit: i64) -> Customer {
        Customer::new("ayse", "Ayse", "Yilmaz", Money::from_major(limit)).unwrap()
    }

    #[test]
    fn test_reserve_past_decimal_range_is_insufficient() {
        let limit = Money::from_decimal(Decimal::MAX);
        let mut c = Customer::new("ayse", "Ayse", "Yilmaz", limit).unwrap();
        c.used_credit_limit = Money::from_decimal(Decimal::MAX);

        let err = c.reserve_credit(Money::from_major(1_100)).unwrap_err();
        assert!(matches!(err, LoanError::InsufficientCredit { .. }));
        assert_eq!(c.used_credit_limit, Money::from_decimal(Decimal::MAX));
    }

    #[test]
    fn test_reserve_within_limit() {
        let mut c = customer(50_000);
        let used = c.reserve_credit(Money::from_major(12_000)).unwrap();
        assert_eq!(used, Money::from_major(12_000));
        assert_eq!(c.available_credit(), Money::from_major(38_000));
    }

    #[test]
    fn test_reserve_exactly_to_limit() {
        let mut c = customer(12_000);
        assert!(c.reserve_credit(Money::from_major(12_000)).is_ok());
        assert_eq!(c.available_credit(), Money::ZERO);
    }

    #[test]
    fn test_reserve_over_limit_leaves_record_untouched() {
        let mut c = customer(50_000);
        c.reserve_credit(Money::from_major(12_000)).unwrap();

        let err = c
            .reserve_credit(Money::from_decimal(dec!(44001.1)))
            .unwrap_err();
        assert_eq!(
            err,
            LoanError::InsufficientCredit {
                available: Money::from_major(38_000),
                requested: Money::from_decimal(dec!(44001.1)),
            }
        );
        assert_eq!(c.used_credit_limit, Money::from_major(12_000));
    }

    #[test]
    fn test_negative_limit_rejected() {
        assert!(Customer::new("x", "X", "Y", Money::from_major(-1)).is_err());
    }

    #[test]
    fn test_update_keeps_usage_within_limit() {
        let mut c = customer(10_000);
        c.reserve_credit(Money::from_major(8_000)).unwrap();

        let lowered = CustomerUpdate {
            credit_limit: Some(Money::from_major(5_000)),
            ..Default::default()
        };
        assert!(matches!(
            c.apply_update(lowered),
            Err(LoanError::InvalidCustomer { .. })
        ));
        assert_eq!(c.credit_limit, Money::from_major(10_000));

        let renamed = CustomerUpdate {
            name: Some("Fatma".to_string()),
            credit_limit: Some(Money::from_major(20_000)),
            ..Default::default()
        };
        c.apply_update(renamed).unwrap();
        assert_eq!(c.name, "Fatma");
        assert_eq!(c.available_credit(), Money::from_major(12_000));
    }
}
