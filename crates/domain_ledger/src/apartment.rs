//! Apartment registry types
//!
//! An apartment's balance is the signed amount it owes (positive) or holds
//! as credit (negative). The balance field is written only by the billing
//! ledger's two commit paths; everything else treats it as read-only.

use ledger_kernel::FlatNumber;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One apartment in the association's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    /// Unique flat number
    pub flat: FlatNumber,
    /// Billable area in square metres; used only by per-area tariffs
    pub area: Decimal,
    /// Owner's display name
    pub owner: String,
    /// Running balance: positive = owed, negative = credit
    pub balance: Decimal,
}

impl Apartment {
    /// Creates an apartment with a zero opening balance.
    pub fn new(flat: FlatNumber, area: Decimal, owner: impl Into<String>) -> Self {
        Self {
            flat,
            area,
            owner: owner.into(),
            balance: Decimal::ZERO,
        }
    }

    /// Sets an opening balance carried over from before the ledger was opened.
    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    /// True when the apartment owes the association money.
    pub fn has_debt(&self) -> bool {
        self.balance > Decimal::ZERO
    }

    /// True when the apartment holds a credit.
    pub fn has_credit(&self) -> bool {
        self.balance < Decimal::ZERO
    }
}
