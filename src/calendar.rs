use chrono::{Datelike, Months, NaiveDate};

use crate::errors::{LoanError, Result};

/// first day of the month `date` falls in
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// add whole calendar months to a date
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::InvalidDate {
            message: format!("{} + {} months is out of range", date, months),
        })
}

/// first day of the month `months` calendar months after the month of `date`
pub fn first_of_month_after(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    add_months(first_of_month(date), months)
}

/// signed whole days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_of_month_after() {
        assert_eq!(first_of_month_after(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 1));
        assert_eq!(first_of_month_after(date(2024, 11, 15), 3).unwrap(), date(2025, 2, 1));
        assert_eq!(first_of_month_after(date(2024, 12, 1), 1).unwrap(), date(2025, 1, 1));
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(date(2024, 2, 20), date(2024, 3, 1)), 10);
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 2, 20)), -10);
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 3, 1)), 0);
    }
}
