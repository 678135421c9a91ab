use chrono::NaiveDate;
use tracing::debug;

use crate::calendar::first_of_month_after;
use crate::config::PaymentPolicy;
use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::{sort_by_due_date, Installment};
use crate::types::{AllocationStop, InstallmentId};

use super::adjustment::{AdjustmentCalculator, AdjustmentResult};

/// one installment the payment covers in full
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub installment_id: InstallmentId,
    pub due_date: NaiveDate,
    pub scheduled_amount: Money,
    pub adjustment: AdjustmentResult,
}

impl Settlement {
    pub fn paid_amount(&self) -> Money {
        self.adjustment.adjusted_amount
    }
}

/// result of walking a schedule with a payment amount
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// installments to settle, in due-date order
    pub settlements: Vec<Settlement>,
    pub stop: AllocationStop,
    pub payable_horizon: NaiveDate,
    /// funds left over after the last settlement
    pub unapplied: Money,
}

/// greedy, due-date ordered, all-or-nothing-per-installment allocator
#[derive(Debug, Clone, Copy)]
pub struct PaymentAllocator {
    calculator: AdjustmentCalculator,
    payable_window_months: u32,
}

impl PaymentAllocator {
    pub fn new(policy: &PaymentPolicy) -> Self {
        Self {
            calculator: AdjustmentCalculator::new(policy.daily_adjustment_rate),
            payable_window_months: policy.payable_window_months,
        }
    }

    /// latest due date that may be paid on `today`
    pub fn payable_horizon(&self, today: NaiveDate) -> Result<NaiveDate> {
        first_of_month_after(today, self.payable_window_months)
    }

    /// decide which installments `amount` settles on `today`
    ///
    /// walks unpaid installments by ascending due date and stops at the first one
    /// that is beyond the payable horizon or that the remaining funds cannot cover
    /// in full. later installments are never tried after a stop.
    pub fn allocate(&self, installments: &[Installment], amount: Money, today: NaiveDate) -> Result<Allocation> {
        let payable_horizon = self.payable_horizon(today)?;
        debug!(%today, %payable_horizon, %amount, "allocating payment");

        let mut ordered = installments.to_vec();
        sort_by_due_date(&mut ordered);

        let mut remaining = amount;
        let mut settlements = Vec::new();
        let mut stop = AllocationStop::ScheduleExhausted;

        for installment in ordered.iter().filter(|i| !i.paid) {
            if installment.due_date > payable_horizon {
                stop = AllocationStop::OutsidePayableWindow;
                break;
            }

            let adjustment = self
                .calculator
                .calculate(installment.amount, installment.due_date, today)?;

            if remaining < adjustment.adjusted_amount {
                stop = AllocationStop::InsufficientFunds;
                break;
            }

            remaining -= adjustment.adjusted_amount;
            settlements.push(Settlement {
                installment_id: installment.id,
                due_date: installment.due_date,
                scheduled_amount: installment.amount,
                adjustment,
            });
        }

        Ok(Allocation {
            settlements,
            stop,
            payable_horizon,
            unapplied: remaining,
        })
    }
}
