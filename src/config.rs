use std::env;
use std::fs;
use std::path::Path;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::decimal::Rate;
use crate::errors::{LoanError, Result};

/// lending configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LendingConfig {
    #[serde(default)]
    pub issuance: IssuancePolicy,
    #[serde(default)]
    pub payment: PaymentPolicy,
}

/// rules a loan request must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuancePolicy {
    /// installment counts a loan may be split into
    pub allowed_installment_counts: Vec<u32>,
    /// lowest accepted interest rate, inclusive
    pub min_interest_rate: Rate,
    /// highest accepted interest rate, inclusive
    pub max_interest_rate: Rate,
}

/// rules governing how payments are applied to installments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPolicy {
    /// discount per day paid early, and penalty per day paid late
    pub daily_adjustment_rate: Rate,
    /// installments due after the first day of the month this many months
    /// from today cannot be paid yet
    pub payable_window_months: u32,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            allowed_installment_counts: vec![6, 9, 12, 24],
            min_interest_rate: Rate::from_decimal(dec!(0.1)),
            max_interest_rate: Rate::from_decimal(dec!(0.5)),
        }
    }
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            daily_adjustment_rate: Rate::from_decimal(dec!(0.001)),
            payable_window_months: 3,
        }
    }
}

impl IssuancePolicy {
    pub fn allows_installment_count(&self, count: u32) -> bool {
        self.allowed_installment_counts.contains(&count)
    }

    pub fn allows_interest_rate(&self, rate: Rate) -> bool {
        rate >= self.min_interest_rate && rate <= self.max_interest_rate
    }
}

impl LendingConfig {
    /// validates the configuration for logical consistency
    pub fn validate(&self) -> Result<()> {
        let issuance = &self.issuance;
        if issuance.allowed_installment_counts.is_empty() {
            return Err(invalid("at least one installment count must be allowed"));
        }
        if issuance.allowed_installment_counts.contains(&0) {
            return Err(invalid("installment count 0 cannot be allowed"));
        }
        if issuance.min_interest_rate.is_negative() {
            return Err(invalid("minimum interest rate cannot be negative"));
        }
        if issuance.min_interest_rate > issuance.max_interest_rate {
            return Err(invalid(format!(
                "minimum interest rate {} exceeds maximum {}",
                issuance.min_interest_rate, issuance.max_interest_rate
            )));
        }
        if self.payment.daily_adjustment_rate.is_negative() {
            return Err(invalid("daily adjustment rate cannot be negative"));
        }
        if self.payment.payable_window_months == 0 {
            return Err(invalid("payable window must span at least one month"));
        }
        Ok(())
    }

    /// load from a json document; missing sections keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LendingConfig = serde_json::from_str(json)
            .map_err(|e| invalid(format!("cannot parse json: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// load from a json file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// load from `LOANS_*` environment variables; unset variables keep defaults
    #[instrument]
    pub fn from_env() -> Result<Self> {
        debug!("loading lending configuration from environment");
        let mut config = LendingConfig::default();

        if let Some(counts) = env_var("LOANS_INSTALLMENT_COUNTS") {
            config.issuance.allowed_installment_counts = counts
                .split(',')
                .map(|c| c.trim().parse::<u32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| invalid(format!("LOANS_INSTALLMENT_COUNTS: {}", e)))?;
        }
        if let Some(rate) = env_var("LOANS_MIN_INTEREST_RATE") {
            config.issuance.min_interest_rate = parse_rate("LOANS_MIN_INTEREST_RATE", &rate)?;
        }
        if let Some(rate) = env_var("LOANS_MAX_INTEREST_RATE") {
            config.issuance.max_interest_rate = parse_rate("LOANS_MAX_INTEREST_RATE", &rate)?;
        }
        if let Some(rate) = env_var("LOANS_DAILY_ADJUSTMENT_RATE") {
            config.payment.daily_adjustment_rate = parse_rate("LOANS_DAILY_ADJUSTMENT_RATE", &rate)?;
        }
        if let Some(months) = env_var("LOANS_PAYABLE_WINDOW_MONTHS") {
            config.payment.payable_window_months = months
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid(format!("LOANS_PAYABLE_WINDOW_MONTHS: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_rate(name: &str, value: &str) -> Result<Rate> {
    Rate::from_str_exact(value.trim()).map_err(|e| invalid(format!("{}: {}", name, e)))
}

fn invalid(message: impl Into<String>) -> LoanError {
    LoanError::InvalidConfiguration {
        message: message.into(),
    }
}
