//! The billing ledger service
//!
//! [`BillingLedger`] owns the consistency invariants: one charge record per
//! `(flat, month, year)`, balances that always equal
//! `opening + Σ charges − Σ payments`, and atomic payment commits. All
//! mutation paths run under a per-apartment async lock with a bounded wait,
//! so a late payment racing a regeneration on the same flat serializes
//! instead of interleaving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use ledger_kernel::{round2, BillingPeriod, FlatNumber};
use rust_decimal::Decimal;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::calculator::compute_charge;
use crate::charge::{ChargeRecord, PaymentRecord};
use crate::error::LedgerError;
use crate::report::YearlyReport;
use crate::store::LedgerStore;

/// Tuning knobs for the ledger service.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long a mutation waits for an apartment's lock before failing
    /// with [`LedgerError::Busy`].
    pub lock_timeout: Duration,
}

impl LedgerConfig {
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// Registry of per-apartment locks, created on first use.
#[derive(Default)]
struct FlatLocks {
    inner: Mutex<HashMap<FlatNumber, Arc<AsyncMutex<()>>>>,
}

impl FlatLocks {
    fn for_flat(&self, flat: FlatNumber) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().expect("flat lock registry poisoned");
        map.entry(flat).or_default().clone()
    }
}

/// The stateful billing core for one association.
///
/// Holds an explicit store handle; there is no global connection state.
/// Wrap the ledger in an `Arc` to share it across tasks.
pub struct BillingLedger {
    store: Arc<dyn LedgerStore>,
    locks: FlatLocks,
    config: LedgerConfig,
}

impl BillingLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            locks: FlatLocks::default(),
            config,
        }
    }

    /// Access to the underlying store, for collaborators that seed rosters
    /// and tariffs.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    async fn lock_flat(&self, flat: FlatNumber) -> Result<OwnedMutexGuard<()>, LedgerError> {
        let lock = self.locks.for_flat(flat);
        tokio::time::timeout(self.config.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| LedgerError::Busy { flat })
    }

    /// Generates (or regenerates) the charge records for one month.
    ///
    /// Fresh records snapshot the apartment's current balance as
    /// `previous_balance` and advance the balance by the month's total, so
    /// unpaid debt carries forward into the next period's `amount_due`.
    /// Regeneration overwrites only the computed fields, preserves recorded
    /// payments, and adjusts the balance by the recomputed delta - running
    /// it twice with unchanged tariffs and areas is a no-op.
    ///
    /// Returns the records in flat-number order.
    pub async fn generate_monthly_charges(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<ChargeRecord>, LedgerError> {
        let period = BillingPeriod::new(month, year)?;
        let tariffs = self.store.list_tariffs().await?;
        let mut apartments = self.store.list_apartments().await?;
        apartments.sort_by_key(|a| a.flat);

        info!(%period, apartments = apartments.len(), "generating monthly charges");

        let mut records = Vec::with_capacity(apartments.len());
        for apartment in apartments {
            let flat = apartment.flat;
            let computed = compute_charge(&apartment, &tariffs)?;

            let _guard = self.lock_flat(flat).await?;
            // Re-read under the lock: a payment may have landed since the
            // roster was listed.
            let current = self
                .store
                .get_apartment(flat)
                .await?
                .ok_or(LedgerError::ApartmentNotFound { flat })?;

            let (record, new_balance) = match self.store.get_charge(flat, period).await? {
                Some(mut existing) => {
                    let delta = existing.revise(computed);
                    (existing, round2(current.balance + delta))
                }
                None => {
                    let record = ChargeRecord::new(flat, period, computed, current.balance);
                    let new_balance = round2(current.balance + record.total_charge);
                    (record, new_balance)
                }
            };

            self.store.commit_generation(&record, new_balance).await?;
            debug!(
                %flat,
                total = %record.total_charge,
                amount_due = %record.amount_due,
                %new_balance,
                "charge committed"
            );
            records.push(record);
        }

        Ok(records)
    }

    /// Records a payment against a previously generated charge.
    ///
    /// The charge-record update, the payment row, and the balance write
    /// commit as one unit of work; any failure leaves all three in their
    /// pre-call state. Returns the apartment's new balance.
    pub async fn record_payment(
        &self,
        flat: FlatNumber,
        month: u32,
        year: i32,
        amount: Decimal,
        date_paid: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        let period = BillingPeriod::new(month, year)?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount });
        }
        let amount = round2(amount);

        let _guard = self.lock_flat(flat).await?;
        let apartment = self
            .store
            .get_apartment(flat)
            .await?
            .ok_or(LedgerError::ApartmentNotFound { flat })?;
        let mut charge = self
            .store
            .get_charge(flat, period)
            .await?
            .ok_or(LedgerError::ChargeRecordNotFound { flat, period })?;

        charge.apply_payment(amount, date_paid);
        let payment = PaymentRecord::new(flat, period, amount, date_paid);
        let new_balance = round2(apartment.balance - amount);

        self.store
            .commit_payment(&charge, &payment, new_balance)
            .await?;

        info!(%flat, %period, %amount, %new_balance, "payment recorded");
        Ok(new_balance)
    }

    /// Snapshot read of one charge record; takes no lock.
    pub async fn get_charge_record(
        &self,
        flat: FlatNumber,
        month: u32,
        year: i32,
    ) -> Result<Option<ChargeRecord>, LedgerError> {
        let period = BillingPeriod::new(month, year)?;
        Ok(self.store.get_charge(flat, period).await?)
    }

    /// Builds the yearly summary for one apartment. Read-only, but holds
    /// the flat's lock across its two reads so the balance and the charge
    /// records come from one snapshot - a payment landing in between would
    /// otherwise show up in `paid_amount` but not in `year_end_balance`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoRecordsFound`] when the year holds no charge
    /// records for the flat - recoverable, meant to be shown to the
    /// operator rather than treated as a fault.
    pub async fn yearly_report(
        &self,
        flat: FlatNumber,
        year: i32,
    ) -> Result<YearlyReport, LedgerError> {
        let _guard = self.lock_flat(flat).await?;
        let apartment = self
            .store
            .get_apartment(flat)
            .await?
            .ok_or(LedgerError::ApartmentNotFound { flat })?;

        let records = self.store.charges_for_year(flat, year).await?;
        if records.is_empty() {
            return Err(LedgerError::NoRecordsFound { flat, year });
        }

        Ok(YearlyReport::build(flat, year, records, apartment.balance))
    }
}
