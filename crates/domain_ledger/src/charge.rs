//! Charge and payment records
//!
//! A [`ChargeRecord`] is the stored result of billing one apartment for one
//! period, keyed by `(flat, month, year)`. Records are upserted on
//! regeneration and never deleted; payment history accumulates in
//! `paid_amount` and in separate [`PaymentRecord`] rows.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use ledger_kernel::{round2, BillingPeriod, FlatNumber, PaymentId, ServiceCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::ComputedCharge;

/// Derived payment state of a charge record.
///
/// The record itself tracks only the cumulative `paid_amount`; status is
/// computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    /// Generated, nothing paid yet
    Generated,
    /// Some payment recorded, less than the period's own charge
    PartiallyPaid,
    /// Paid up to (or beyond) the period's charge
    Paid,
}

/// The stored result of billing one apartment for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub flat: FlatNumber,
    pub period: BillingPeriod,
    /// Charged amount per service code
    pub breakdown: BTreeMap<ServiceCode, Decimal>,
    /// Rounded sum of the breakdown
    pub total_charge: Decimal,
    /// Balance snapshot taken when the record was first generated
    pub previous_balance: Decimal,
    /// `total_charge + previous_balance`
    pub amount_due: Decimal,
    /// Cumulative amount paid against this period
    pub paid_amount: Decimal,
    /// Date of the most recent payment, if any
    pub date_paid: Option<NaiveDate>,
}

impl ChargeRecord {
    /// Builds a fresh record for a period that has not been billed before.
    pub fn new(
        flat: FlatNumber,
        period: BillingPeriod,
        computed: ComputedCharge,
        previous_balance: Decimal,
    ) -> Self {
        let amount_due = round2(computed.total_charge + previous_balance);
        Self {
            flat,
            period,
            breakdown: computed.breakdown,
            total_charge: computed.total_charge,
            previous_balance,
            amount_due,
            paid_amount: Decimal::ZERO,
            date_paid: None,
        }
    }

    /// Overwrites the computed fields on regeneration, preserving the
    /// original balance snapshot and any recorded payment.
    ///
    /// Returns the delta of the new total against the old one, which is the
    /// adjustment the apartment's balance needs so that regeneration never
    /// double-counts a charge.
    pub fn revise(&mut self, computed: ComputedCharge) -> Decimal {
        let delta = round2(computed.total_charge - self.total_charge);
        self.breakdown = computed.breakdown;
        self.total_charge = computed.total_charge;
        self.amount_due = round2(self.total_charge + self.previous_balance);
        delta
    }

    /// Adds a payment to the cumulative total and stamps the payment date.
    pub fn apply_payment(&mut self, amount: Decimal, date_paid: NaiveDate) {
        self.paid_amount = round2(self.paid_amount + amount);
        self.date_paid = Some(date_paid);
    }

    /// Amount still owed on this record.
    pub fn outstanding(&self) -> Decimal {
        round2(self.amount_due - self.paid_amount)
    }

    pub fn status(&self) -> ChargeStatus {
        if self.paid_amount.is_zero() {
            ChargeStatus::Generated
        } else if self.paid_amount < self.total_charge {
            ChargeStatus::PartiallyPaid
        } else {
            ChargeStatus::Paid
        }
    }
}

/// One recorded payment, always committed together with the matching
/// charge-record update and apartment balance write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub flat: FlatNumber,
    pub period: BillingPeriod,
    /// Positive amount paid
    pub amount: Decimal,
    /// Operator-entered payment date
    pub date_paid: NaiveDate,
    /// When the ledger committed the payment
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        flat: FlatNumber,
        period: BillingPeriod,
        amount: Decimal,
        date_paid: NaiveDate,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            flat,
            period,
            amount,
            date_paid,
            recorded_at: Utc::now(),
        }
    }
}
