//! Ledger domain errors
//!
//! Every error carries enough context (flat number, period) for an operator
//! to retry or display the failure; none of them is fatal to the process.

use ledger_kernel::{BillingPeriod, FlatNumber, PeriodError, ServiceCode};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur in the billing ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A tariff carries a negative rate
    #[error("invalid tariff {service_code}: rate {rate} must not be negative")]
    InvalidTariff {
        service_code: ServiceCode,
        rate: Decimal,
    },

    /// An apartment's area cannot support per-area billing
    #[error("invalid apartment {flat}: area {area} must be positive for per-area tariffs")]
    InvalidApartment { flat: FlatNumber, area: Decimal },

    /// A payment amount was zero or negative
    #[error("invalid payment amount {amount}: must be positive")]
    InvalidAmount { amount: Decimal },

    /// The billing month was out of range
    #[error(transparent)]
    InvalidPeriod(#[from] PeriodError),

    /// No apartment registered under the given flat number
    #[error("apartment {flat} not found")]
    ApartmentNotFound { flat: FlatNumber },

    /// No charge was generated for the apartment and period
    #[error("no charge record for apartment {flat} in period {period}; generate charges first")]
    ChargeRecordNotFound {
        flat: FlatNumber,
        period: BillingPeriod,
    },

    /// A yearly report was requested for a year with no records
    #[error("no charge records found for apartment {flat} in {year}")]
    NoRecordsFound { flat: FlatNumber, year: i32 },

    /// Another operation holds the apartment's lock; retryable
    #[error("ledger busy: apartment {flat} is locked by another operation")]
    Busy { flat: FlatNumber },

    /// The underlying store failed; the operation was not applied
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// True when the caller may simply retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Busy { .. } => true,
            LedgerError::Storage(e) => e.is_transient(),
            _ => false,
        }
    }

    /// True when the error reports a missing entity rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::ApartmentNotFound { .. }
                | LedgerError::ChargeRecordNotFound { .. }
                | LedgerError::NoRecordsFound { .. }
        )
    }
}
