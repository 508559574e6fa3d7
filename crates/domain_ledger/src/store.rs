//! Storage port for the billing ledger
//!
//! The ledger drives all persistence through this trait; adapters live in
//! `infra_store`. The two `commit_*` methods are the only writers of
//! apartment balances and must apply their writes as a single unit of work:
//! either every row lands or none does.

use async_trait::async_trait;
use ledger_kernel::{BillingPeriod, FlatNumber};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::apartment::Apartment;
use crate::charge::{ChargeRecord, PaymentRecord};
use crate::tariff::Tariff;

/// Errors reported by storage adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the underlying store
    #[error("failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// A query failed to execute
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness or integrity constraint was violated
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored data could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A multi-write transaction aborted; nothing was applied
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

impl StoreError {
    /// True for failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed(_) | StoreError::TransactionFailed(_)
        )
    }
}

/// Persistence contract the billing ledger depends on.
///
/// Logical layout: apartments keyed by flat number, tariffs keyed by service
/// code, charge records keyed by `(flat, month, year)`, and an append-only
/// payment log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All tariffs in the catalog, ordered by service code.
    async fn list_tariffs(&self) -> Result<Vec<Tariff>, StoreError>;

    /// Adds a tariff; replaces an existing one with the same service code.
    async fn insert_tariff(&self, tariff: &Tariff) -> Result<(), StoreError>;

    /// All apartments in the roster, ordered by flat number.
    async fn list_apartments(&self) -> Result<Vec<Apartment>, StoreError>;

    /// Adds an apartment to the roster. Fails with `ConstraintViolation`
    /// when the flat number is already registered.
    async fn insert_apartment(&self, apartment: &Apartment) -> Result<(), StoreError>;

    async fn get_apartment(&self, flat: FlatNumber) -> Result<Option<Apartment>, StoreError>;

    async fn get_charge(
        &self,
        flat: FlatNumber,
        period: BillingPeriod,
    ) -> Result<Option<ChargeRecord>, StoreError>;

    /// Charge records for one apartment and year, in any order.
    async fn charges_for_year(
        &self,
        flat: FlatNumber,
        year: i32,
    ) -> Result<Vec<ChargeRecord>, StoreError>;

    /// Payment history for one apartment, oldest first.
    async fn payments_for_flat(&self, flat: FlatNumber)
        -> Result<Vec<PaymentRecord>, StoreError>;

    /// Atomically upserts a charge record by its natural key and writes the
    /// apartment's new balance.
    async fn commit_generation(
        &self,
        charge: &ChargeRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError>;

    /// Atomically updates the charge record, appends the payment, and
    /// writes the apartment's new balance. A failure anywhere must leave
    /// all three untouched.
    async fn commit_payment(
        &self,
        charge: &ChargeRecord,
        payment: &PaymentRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError>;
}
