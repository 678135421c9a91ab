use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar::days_between;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::AdjustmentKind;

/// daily discount/penalty factor applied when no policy overrides it
pub const DEFAULT_DAILY_ADJUSTMENT: Decimal = dec!(0.001);

/// installment amount after an early-payment discount or late-payment penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub adjusted_amount: Money,
    pub discount: Money,
    pub penalty: Money,
}

impl AdjustmentResult {
    pub fn kind(&self) -> AdjustmentKind {
        if self.discount.is_positive() {
            AdjustmentKind::EarlyDiscount
        } else if self.penalty.is_positive() {
            AdjustmentKind::LatePenalty
        } else {
            AdjustmentKind::OnTime
        }
    }
}

/// computes adjusted installment amounts from the gap between due and payment date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentCalculator {
    daily_rate: Rate,
}

impl Default for AdjustmentCalculator {
    fn default() -> Self {
        Self::new(Rate::from_decimal(DEFAULT_DAILY_ADJUSTMENT))
    }
}

impl AdjustmentCalculator {
    pub fn new(daily_rate: Rate) -> Self {
        Self { daily_rate }
    }

    /// adjust `amount` due on `due_date` for payment on `payment_date`
    ///
    /// every output is rounded half-up to cents from the unrounded intermediate,
    /// so `adjusted_amount` is not necessarily `amount - discount` of the rounded parts.
    pub fn calculate(
        &self,
        amount: Money,
        due_date: NaiveDate,
        payment_date: NaiveDate,
    ) -> Result<AdjustmentResult> {
        let days_early = days_between(payment_date, due_date);
        let out_of_range = || LoanError::AmountOutOfRange { amount };

        let change = self
            .daily_rate
            .as_decimal()
            .checked_mul(Decimal::from(days_early.unsigned_abs()))
            .and_then(|factor| amount.checked_mul(factor))
            .ok_or_else(out_of_range)?;

        let (adjusted, discount, penalty) = if days_early > 0 {
            let adjusted = amount
                .as_decimal()
                .checked_sub(change.as_decimal())
                .ok_or_else(out_of_range)?;
            (Money::from_decimal(adjusted), change, Money::ZERO)
        } else if days_early < 0 {
            let adjusted = amount.checked_add(change).ok_or_else(out_of_range)?;
            (adjusted, Money::ZERO, change)
        } else {
            (amount, Money::ZERO, Money::ZERO)
        };

        Ok(AdjustmentResult {
            adjusted_amount: adjusted.round_currency(),
            discount: discount.round_currency(),
            penalty: penalty.round_currency(),
        })
    }
}

/// adjust with the default daily factor
pub fn adjust(
    amount: Money,
    due_date: NaiveDate,
    payment_date: NaiveDate,
) -> Result<AdjustmentResult> {
    AdjustmentCalculator::default().calculate(amount, due_date, payment_date)
}
