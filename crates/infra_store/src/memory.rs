//! In-memory store
//!
//! Backs the test suite and any single-process deployment that does not
//! need durability. A single `RwLock` over the whole state makes each store
//! call atomic on its own; the commit methods additionally roll back their
//! first write when a later step fails, matching the port contract.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use domain_ledger::{Apartment, ChargeRecord, LedgerStore, PaymentRecord, StoreError, Tariff};
use ledger_kernel::{BillingPeriod, FlatNumber, ServiceCode};
use rust_decimal::Decimal;

#[derive(Default)]
struct Inner {
    apartments: BTreeMap<FlatNumber, Apartment>,
    tariffs: BTreeMap<ServiceCode, Tariff>,
    charges: BTreeMap<(FlatNumber, BillingPeriod), ChargeRecord>,
    payments: Vec<PaymentRecord>,
}

/// A `LedgerStore` over in-process maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_next_payment_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot fault: the next `commit_payment` fails after its
    /// charge write and rolls back, leaving all state untouched. Used by
    /// the atomicity tests.
    pub fn fail_next_payment_commit(&self) {
        self.fail_next_payment_commit.store(true, Ordering::SeqCst);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("memory store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_tariffs(&self) -> Result<Vec<Tariff>, StoreError> {
        Ok(self.read().tariffs.values().cloned().collect())
    }

    async fn insert_tariff(&self, tariff: &Tariff) -> Result<(), StoreError> {
        self.write()
            .tariffs
            .insert(tariff.service_code.clone(), tariff.clone());
        Ok(())
    }

    async fn list_apartments(&self) -> Result<Vec<Apartment>, StoreError> {
        Ok(self.read().apartments.values().cloned().collect())
    }

    async fn insert_apartment(&self, apartment: &Apartment) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.apartments.contains_key(&apartment.flat) {
            return Err(StoreError::ConstraintViolation(format!(
                "apartment {} already registered",
                apartment.flat
            )));
        }
        inner.apartments.insert(apartment.flat, apartment.clone());
        Ok(())
    }

    async fn get_apartment(&self, flat: FlatNumber) -> Result<Option<Apartment>, StoreError> {
        Ok(self.read().apartments.get(&flat).cloned())
    }

    async fn get_charge(
        &self,
        flat: FlatNumber,
        period: BillingPeriod,
    ) -> Result<Option<ChargeRecord>, StoreError> {
        Ok(self.read().charges.get(&(flat, period)).cloned())
    }

    async fn charges_for_year(
        &self,
        flat: FlatNumber,
        year: i32,
    ) -> Result<Vec<ChargeRecord>, StoreError> {
        Ok(self
            .read()
            .charges
            .values()
            .filter(|c| c.flat == flat && c.period.year() == year)
            .cloned()
            .collect())
    }

    async fn payments_for_flat(
        &self,
        flat: FlatNumber,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        Ok(self
            .read()
            .payments
            .iter()
            .filter(|p| p.flat == flat)
            .cloned()
            .collect())
    }

    async fn commit_generation(
        &self,
        charge: &ChargeRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut inner = self.write();
        let key = (charge.flat, charge.period);
        let previous = inner.charges.insert(key, charge.clone());

        match inner.apartments.get_mut(&charge.flat) {
            Some(apartment) => {
                apartment.balance = new_balance;
                Ok(())
            }
            None => {
                // Roll back the charge write before reporting.
                match previous {
                    Some(prev) => inner.charges.insert(key, prev),
                    None => inner.charges.remove(&key),
                };
                Err(StoreError::ConstraintViolation(format!(
                    "apartment {} not registered",
                    charge.flat
                )))
            }
        }
    }

    async fn commit_payment(
        &self,
        charge: &ChargeRecord,
        payment: &PaymentRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut inner = self.write();
        let key = (charge.flat, charge.period);
        let previous = inner.charges.insert(key, charge.clone());

        let rollback = |inner: &mut Inner, previous: Option<ChargeRecord>| match previous {
            Some(prev) => {
                inner.charges.insert(key, prev);
            }
            None => {
                inner.charges.remove(&key);
            }
        };

        if self.fail_next_payment_commit.swap(false, Ordering::SeqCst) {
            rollback(&mut inner, previous);
            return Err(StoreError::TransactionFailed(
                "injected failure between charge and balance writes".to_string(),
            ));
        }

        match inner.apartments.get_mut(&charge.flat) {
            Some(apartment) => {
                apartment.balance = new_balance;
                inner.payments.push(payment.clone());
                Ok(())
            }
            None => {
                rollback(&mut inner, previous);
                Err(StoreError::ConstraintViolation(format!(
                    "apartment {} not registered",
                    charge.flat
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::calculator::ComputedCharge;
    use rust_decimal_macros::dec;

    fn flat(n: u32) -> FlatNumber {
        FlatNumber::new(n).unwrap()
    }

    fn charge_for(f: FlatNumber) -> ChargeRecord {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(ServiceCode::new("SD").unwrap(), dec!(1800.00));
        ChargeRecord::new(
            f,
            BillingPeriod::new(1, 2024).unwrap(),
            ComputedCharge {
                breakdown,
                total_charge: dec!(1800.00),
            },
            dec!(0),
        )
    }

    #[tokio::test]
    async fn insert_apartment_rejects_duplicates() {
        let store = MemoryStore::new();
        let apartment = Apartment::new(flat(1), dec!(45.0), "А.Е. Асанов");

        store.insert_apartment(&apartment).await.unwrap();
        let err = store.insert_apartment(&apartment).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn commit_generation_upserts_and_writes_balance() {
        let store = MemoryStore::new();
        let f = flat(1);
        store
            .insert_apartment(&Apartment::new(f, dec!(45.0), "А.Е. Асанов"))
            .await
            .unwrap();

        let charge = charge_for(f);
        store.commit_generation(&charge, dec!(1800.00)).await.unwrap();

        assert_eq!(
            store.get_apartment(f).await.unwrap().unwrap().balance,
            dec!(1800.00)
        );
        assert_eq!(
            store.get_charge(f, charge.period).await.unwrap().unwrap(),
            charge
        );
    }

    #[tokio::test]
    async fn commit_generation_for_unknown_flat_rolls_back_charge() {
        let store = MemoryStore::new();
        let charge = charge_for(flat(9));

        let err = store.commit_generation(&charge, dec!(1800.00)).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert!(store.get_charge(flat(9), charge.period).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_payment_failure_leaves_state_untouched() {
        let store = MemoryStore::new();
        let f = flat(1);
        store
            .insert_apartment(&Apartment::new(f, dec!(45.0), "А.Е. Асанов"))
            .await
            .unwrap();
        let charge = charge_for(f);
        store.commit_generation(&charge, dec!(1800.00)).await.unwrap();

        let mut paid = charge.clone();
        paid.apply_payment(
            dec!(500.00),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        );
        let payment = PaymentRecord::new(f, charge.period, dec!(500.00), paid.date_paid.unwrap());

        store.fail_next_payment_commit();
        let err = store
            .commit_payment(&paid, &payment, dec!(1300.00))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TransactionFailed(_)));

        // Pre-call state everywhere.
        assert_eq!(
            store.get_apartment(f).await.unwrap().unwrap().balance,
            dec!(1800.00)
        );
        assert_eq!(
            store.get_charge(f, charge.period).await.unwrap().unwrap(),
            charge
        );
        assert!(store.payments_for_flat(f).await.unwrap().is_empty());

        // The fault is one-shot: the retry succeeds.
        store
            .commit_payment(&paid, &payment, dec!(1300.00))
            .await
            .unwrap();
        assert_eq!(
            store.get_apartment(f).await.unwrap().unwrap().balance,
            dec!(1300.00)
        );
        assert_eq!(store.payments_for_flat(f).await.unwrap().len(), 1);
    }
}
