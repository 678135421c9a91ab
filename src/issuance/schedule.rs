use chrono::NaiveDate;

use crate::calendar::{add_months, first_of_month_after};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::loan::Installment;
use crate::types::LoanId;

/// equal-installment repayment schedule of one loan
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentSchedule {
    pub loan_id: LoanId,
    pub total_amount: Money,
    /// total ÷ count, rounded half-up to cents; identical for every installment
    pub installment_amount: Money,
    pub installments: Vec<Installment>,
}

impl InstallmentSchedule {
    /// generate `count` monthly installments, the first due on the first day of
    /// the month after `issued_on`
    pub fn generate(
        loan_id: LoanId,
        total_amount: Money,
        count: u32,
        issued_on: NaiveDate,
    ) -> Result<Self> {
        let installment_amount = total_amount.split_even(count).ok_or_else(|| {
            LoanError::InvalidInstallmentCount {
                count,
                allowed: Vec::new(),
            }
        })?;

        let first_due = first_of_month_after(issued_on, 1)?;
        let installments = (0..count)
            .map(|i| add_months(first_due, i).map(|due| Installment::new(loan_id, installment_amount, due)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            loan_id,
            total_amount,
            installment_amount,
            installments,
        })
    }

    /// sum of all installment amounts as scheduled, `None` past the decimal range
    pub fn scheduled_total(&self) -> Option<Money> {
        self.installments
            .iter()
            .try_fold(Money::ZERO, |sum, i| sum.checked_add(i.amount))
    }

    /// scheduled total minus the loan total; the last installment does not absorb it
    pub fn rounding_drift(&self) -> Option<Money> {
        self.scheduled_total().map(|scheduled| scheduled - self.total_amount)
    }

    pub fn into_installments(self) -> Vec<Installment> {
        self.installments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_even_split() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(12_000),
            12,
            date(2024, 1, 15),
        )
        .unwrap();

        assert_eq!(schedule.installments.len(), 12);
        assert_eq!(schedule.installment_amount, Money::from_major(1_000));
        assert_eq!(schedule.scheduled_total(), Some(Money::from_major(12_000)));
        assert!(schedule.rounding_drift().unwrap().is_zero());
    }

    #[test]
    fn test_due_dates_are_consecutive_month_starts() {
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(6_000),
            6,
            date(2024, 10, 31),
        )
        .unwrap();

        let due: Vec<_> = schedule.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(
            due,
            vec![
                date(2024, 11, 1),
                date(2024, 12, 1),
                date(2025, 1, 1),
                date(2025, 2, 1),
                date(2025, 3, 1),
                date(2025, 4, 1),
            ]
        );
        assert!(schedule.installments.iter().all(|i| !i.paid && i.paid_amount.is_zero()));
    }

    #[test]
    fn test_rounding_drift_is_not_redistributed() {
        // 1000 / 6 = 166.666.. -> 166.67, six of them = 1000.02
        let schedule = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(1_000),
            6,
            date(2024, 1, 1),
        )
        .unwrap();

        assert!(schedule
            .installments
            .iter()
            .all(|i| i.amount.as_decimal() == dec!(166.67)));
        assert_eq!(schedule.rounding_drift().unwrap().as_decimal(), dec!(0.02));
    }

    #[test]
    fn test_drift_bounded_by_half_cent_per_installment() {
        let totals = [dec!(11999.99), dec!(44001.1), dec!(1234.567), dec!(100.01), dec!(7)];
        for total in totals {
            for count in [6u32, 9, 12, 24] {
                let schedule = InstallmentSchedule::generate(
                    Uuid::new_v4(),
                    Money::from_decimal(total),
                    count,
                    date(2024, 5, 20),
                )
                .unwrap();
                let bound = dec!(0.005) * Decimal::from(count);
                assert!(
                    schedule.rounding_drift().unwrap().as_decimal().abs() <= bound,
                    "total {} count {} drift {:?}",
                    total,
                    count,
                    schedule.rounding_drift()
                );
            }
        }
    }

    #[test]
    fn test_scheduled_total_past_decimal_range_is_none() {
        let loan_id = Uuid::new_v4();
        let huge = Money::from_decimal(Decimal::MAX);
        let schedule = InstallmentSchedule {
            loan_id,
            total_amount: huge,
            installment_amount: huge,
            installments: vec![
                Installment::new(loan_id, huge, date(2024, 2, 1)),
                Installment::new(loan_id, huge, date(2024, 3, 1)),
            ],
        };
        assert!(schedule.scheduled_total().is_none());
        assert!(schedule.rounding_drift().is_none());
    }

    #[test]
    fn test_zero_count_rejected() {
        let result = InstallmentSchedule::generate(
            Uuid::new_v4(),
            Money::from_major(1_000),
            0,
            date(2024, 1, 1),
        );
        assert!(result.is_err());
    }
}
