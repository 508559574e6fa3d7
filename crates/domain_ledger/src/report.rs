//! Yearly reporting
//!
//! Read-only aggregation over an apartment's charge history. Reports never
//! mutate apartment or charge state; they are built from a snapshot read.

use std::fmt;

use ledger_kernel::{format_tenge, round2, FlatNumber};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::charge::ChargeRecord;

/// One apartment's billing summary for a calendar year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyReport {
    pub flat: FlatNumber,
    pub year: i32,
    /// Charge records sorted by month ascending
    pub records: Vec<ChargeRecord>,
    /// Σ total_charge over the year
    pub total_billed: Decimal,
    /// Σ paid_amount over the year
    pub total_paid: Decimal,
    /// The apartment's balance as of the report
    pub year_end_balance: Decimal,
}

impl YearlyReport {
    pub(crate) fn build(
        flat: FlatNumber,
        year: i32,
        mut records: Vec<ChargeRecord>,
        balance: Decimal,
    ) -> Self {
        records.sort_by_key(|r| r.period);

        let total_billed = round2(records.iter().map(|r| r.total_charge).sum());
        let total_paid = round2(records.iter().map(|r| r.paid_amount).sum());

        Self {
            flat,
            year,
            records,
            total_billed,
            total_paid,
            year_end_balance: balance,
        }
    }
}

impl fmt::Display for YearlyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Жылдық есеп: пәтер {}, {} жыл", self.flat, self.year)?;
        for record in &self.records {
            let date_paid = record
                .date_paid
                .map(|d| d.to_string())
                .unwrap_or_else(|| "тіркелмеген".to_string());
            writeln!(
                f,
                "{:<10} есептелген {:>16} төленген {:>16} ({})",
                record.period.month_name(),
                format_tenge(record.total_charge),
                format_tenge(record.paid_amount),
                date_paid,
            )?;
        }
        writeln!(f, "Жалпы есептелген: {}", format_tenge(self.total_billed))?;
        writeln!(f, "Жалпы төленген:   {}", format_tenge(self.total_paid))?;
        write!(
            f,
            "Жыл соңындағы қалдық: {}",
            format_tenge(self.year_end_balance)
        )
    }
}
