//! Billing periods
//!
//! A billing period is a (month, year) pair. Charge records are keyed by
//! apartment and period, and reports sort by period, so the type carries a
//! total order with year taking precedence over month.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors related to billing periods
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),
}

/// One calendar month of billing for a single association year.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BillingPeriod {
    // Year first so the derived ordering sorts chronologically.
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Creates a period, validating the month.
    pub fn new(month: u32, year: i32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Kazakh month name, as printed on operator reports.
    pub fn month_name(&self) -> &'static str {
        const MONTHS: [&str; 12] = [
            "Қаңтар",
            "Ақпан",
            "Наурыз",
            "Сәуір",
            "Мамыр",
            "Маусым",
            "Шілде",
            "Тамыз",
            "Қыркүйек",
            "Қазан",
            "Қараша",
            "Желтоқсан",
        ];
        MONTHS[(self.month - 1) as usize]
    }

    /// The period that follows this one, rolling over the year in December.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}
