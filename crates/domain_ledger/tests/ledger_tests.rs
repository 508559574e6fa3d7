//! End-to-end tests for the billing ledger over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_ledger::{
    Apartment, BillingLedger, ChargeRecord, ChargeStatus, LedgerConfig, LedgerError, LedgerStore,
    PaymentRecord, StoreError, Tariff,
};
use infra_store::MemoryStore;
use ledger_kernel::{BillingPeriod, FlatNumber};
use test_utils::{seeded_store, ApartmentBuilder, TariffBuilder};

fn flat(n: u32) -> FlatNumber {
    FlatNumber::new(n).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Catalog from the worked scenario: SD per-area at 40, UB flat at 850.
async fn scenario_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store
        .insert_tariff(&TariffBuilder::new().with_service_code("SD").per_area().with_rate(dec!(40)).build())
        .await
        .unwrap();
    store
        .insert_tariff(&TariffBuilder::new().with_service_code("UB").per_unit().with_rate(dec!(850)).build())
        .await
        .unwrap();
    store
        .insert_apartment(&ApartmentBuilder::new().with_flat(1).with_area(dec!(45.0)).build())
        .await
        .unwrap();
    Arc::new(store)
}

fn ledger(store: Arc<MemoryStore>) -> BillingLedger {
    BillingLedger::new(store, LedgerConfig::default())
}

#[tokio::test]
async fn generates_scenario_charges() {
    let store = scenario_store().await;
    let ledger = ledger(store);

    let records = ledger.generate_monthly_charges(1, 2024).await.unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.total_charge, dec!(2650.00));
    assert_eq!(record.previous_balance, dec!(0));
    assert_eq!(record.amount_due, dec!(2650.00));
    assert_eq!(record.paid_amount, Decimal::ZERO);
    assert_eq!(record.status(), ChargeStatus::Generated);
}

#[tokio::test]
async fn full_payment_clears_the_balance() {
    let store = scenario_store().await;
    let ledger = ledger(store);
    ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let balance = ledger
        .record_payment(flat(1), 1, 2024, dec!(2650.00), date(2024, 1, 20))
        .await
        .unwrap();

    assert_eq!(balance, dec!(0.00));
    let record = ledger.get_charge_record(flat(1), 1, 2024).await.unwrap().unwrap();
    assert_eq!(record.paid_amount, dec!(2650.00));
    assert_eq!(record.date_paid, Some(date(2024, 1, 20)));
    assert_eq!(record.status(), ChargeStatus::Paid);
}

#[tokio::test]
async fn partial_payment_leaves_the_remainder_owed() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());
    ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let balance = ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(balance, dec!(1650.00));

    let report = ledger.yearly_report(flat(1), 2024).await.unwrap();
    assert_eq!(report.total_billed, dec!(2650.00));
    assert_eq!(report.total_paid, dec!(1000.00));
    assert_eq!(report.year_end_balance, dec!(1650.00));
}

#[tokio::test]
async fn unpaid_debt_carries_into_the_next_period() {
    let store = scenario_store().await;
    let ledger = ledger(store);
    ledger.generate_monthly_charges(1, 2024).await.unwrap();
    let february = ledger.generate_monthly_charges(2, 2024).await.unwrap();

    let record = &february[0];
    assert_eq!(record.previous_balance, dec!(2650.00));
    assert_eq!(record.amount_due, dec!(5300.00));
}

#[tokio::test]
async fn regeneration_is_idempotent_and_preserves_payments() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());

    let first = ledger.generate_monthly_charges(1, 2024).await.unwrap();
    ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap();
    let balance_before = store.get_apartment(flat(1)).await.unwrap().unwrap().balance;

    let second = ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let regenerated = &second[0];
    assert_eq!(regenerated.breakdown, first[0].breakdown);
    assert_eq!(regenerated.total_charge, first[0].total_charge);
    assert_eq!(regenerated.previous_balance, first[0].previous_balance);
    assert_eq!(regenerated.amount_due, first[0].amount_due);
    // Payment history survives regeneration.
    assert_eq!(regenerated.paid_amount, dec!(1000.00));
    assert_eq!(regenerated.date_paid, Some(date(2024, 1, 20)));
    // And the balance is not double-counted.
    let balance_after = store.get_apartment(flat(1)).await.unwrap().unwrap().balance;
    assert_eq!(balance_after, balance_before);
}

#[tokio::test]
async fn regeneration_after_tariff_change_adjusts_by_the_delta() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());
    ledger.generate_monthly_charges(1, 2024).await.unwrap();
    ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap();

    // The maintenance rate goes from 40 to 50 per square metre.
    store
        .insert_tariff(&TariffBuilder::new().with_service_code("SD").per_area().with_rate(dec!(50)).build())
        .await
        .unwrap();
    let regenerated = ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let record = &regenerated[0];
    assert_eq!(record.total_charge, dec!(3100.00));
    assert_eq!(record.amount_due, dec!(3100.00));
    assert_eq!(record.paid_amount, dec!(1000.00));
    // Balance moves by the 450.00 delta only: 1650.00 + 450.00.
    assert_eq!(
        store.get_apartment(flat(1)).await.unwrap().unwrap().balance,
        dec!(2100.00)
    );
}

#[tokio::test]
async fn rejects_non_positive_amounts_without_mutating() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());
    ledger.generate_monthly_charges(1, 2024).await.unwrap();
    let before = store.get_charge(flat(1), BillingPeriod::new(1, 2024).unwrap()).await.unwrap();

    for amount in [dec!(0), dec!(-100)] {
        let err = ledger
            .record_payment(flat(1), 1, 2024, amount, date(2024, 1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    let after = store.get_charge(flat(1), BillingPeriod::new(1, 2024).unwrap()).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(
        store.get_apartment(flat(1)).await.unwrap().unwrap().balance,
        dec!(2650.00)
    );
}

#[tokio::test]
async fn rejects_payment_against_ungenerated_period() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());

    let err = ledger
        .record_payment(flat(1), 1, 2024, dec!(100.00), date(2024, 1, 20))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ChargeRecordNotFound { .. }));
    assert!(err.is_not_found());
    assert_eq!(
        store.get_apartment(flat(1)).await.unwrap().unwrap().balance,
        Decimal::ZERO
    );
    assert!(store.payments_for_flat(flat(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejects_unknown_flat_and_bad_month() {
    let store = scenario_store().await;
    let ledger = ledger(store);

    let err = ledger
        .record_payment(flat(99), 1, 2024, dec!(100.00), date(2024, 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ApartmentNotFound { .. }));

    let err = ledger
        .record_payment(flat(1), 13, 2024, dec!(100.00), date(2024, 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPeriod(_)));
}

#[tokio::test]
async fn injected_commit_failure_leaves_balance_untouched() {
    let store = scenario_store().await;
    let ledger = ledger(store.clone());
    ledger.generate_monthly_charges(1, 2024).await.unwrap();
    let charge_before = ledger.get_charge_record(flat(1), 1, 2024).await.unwrap().unwrap();

    store.fail_next_payment_commit();
    let err = ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Storage(StoreError::TransactionFailed(_))));
    assert!(err.is_retryable());
    assert_eq!(
        store.get_apartment(flat(1)).await.unwrap().unwrap().balance,
        dec!(2650.00)
    );
    let charge_after = ledger.get_charge_record(flat(1), 1, 2024).await.unwrap().unwrap();
    assert_eq!(charge_after, charge_before);
    assert!(store.payments_for_flat(flat(1)).await.unwrap().is_empty());

    // The operation is retryable and succeeds the second time.
    let balance = ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(balance, dec!(1650.00));
}

#[tokio::test]
async fn balance_invariant_holds_over_mixed_operations() {
    let store = Arc::new(seeded_store().await);
    store
        .insert_apartment(
            &ApartmentBuilder::new()
                .with_flat(3)
                .with_area(dec!(50.0))
                .with_owner("С.М. Серіков")
                .with_opening_balance(dec!(500.00))
                .build(),
        )
        .await
        .unwrap();
    let openings = [(1, dec!(0)), (2, dec!(0)), (3, dec!(500.00))];

    let ledger = ledger(store.clone());
    ledger.generate_monthly_charges(1, 2024).await.unwrap();
    ledger
        .record_payment(flat(1), 1, 2024, dec!(4750.00), date(2024, 1, 18))
        .await
        .unwrap();
    ledger.generate_monthly_charges(2, 2024).await.unwrap();
    ledger
        .record_payment(flat(2), 2, 2024, dec!(3000.00), date(2024, 2, 5))
        .await
        .unwrap();
    // Late partial payment against January after February was generated.
    ledger
        .record_payment(flat(3), 1, 2024, dec!(1250.50), date(2024, 2, 7))
        .await
        .unwrap();
    // Regeneration mixed in must not disturb the invariant.
    ledger.generate_monthly_charges(2, 2024).await.unwrap();

    for (n, opening) in openings {
        let f = flat(n);
        let apartment = store.get_apartment(f).await.unwrap().unwrap();
        let charges = store.charges_for_year(f, 2024).await.unwrap();
        let payments = store.payments_for_flat(f).await.unwrap();

        let billed: Decimal = charges.iter().map(|c| c.total_charge).sum();
        let paid: Decimal = payments.iter().map(|p| p.amount).sum();
        assert_eq!(
            apartment.balance,
            opening + billed - paid,
            "invariant broken for apartment {f}"
        );

        let paid_on_charges: Decimal = charges.iter().map(|c| c.paid_amount).sum();
        assert_eq!(paid, paid_on_charges);
    }
}

#[tokio::test]
async fn yearly_report_fails_recoverably_when_year_is_empty() {
    let store = scenario_store().await;
    let ledger = ledger(store);
    ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let err = ledger.yearly_report(flat(1), 2023).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoRecordsFound { flat: _, year: 2023 }));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_charge_record_returns_none_when_absent() {
    let store = scenario_store().await;
    let ledger = ledger(store);

    assert!(ledger.get_charge_record(flat(1), 6, 2024).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Lock contention
// ---------------------------------------------------------------------------

/// Store wrapper that stalls selected calls while the per-flat lock is
/// held, so tests can stage a concurrent operation on the same flat at a
/// precise point.
struct DelayedStore {
    inner: Arc<MemoryStore>,
    commit_delay: Duration,
    charges_delay: Duration,
}

impl DelayedStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            commit_delay: Duration::ZERO,
            charges_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl LedgerStore for DelayedStore {
    async fn list_tariffs(&self) -> Result<Vec<Tariff>, StoreError> {
        self.inner.list_tariffs().await
    }

    async fn insert_tariff(&self, tariff: &Tariff) -> Result<(), StoreError> {
        self.inner.insert_tariff(tariff).await
    }

    async fn list_apartments(&self) -> Result<Vec<Apartment>, StoreError> {
        self.inner.list_apartments().await
    }

    async fn insert_apartment(&self, apartment: &Apartment) -> Result<(), StoreError> {
        self.inner.insert_apartment(apartment).await
    }

    async fn get_apartment(&self, flat: FlatNumber) -> Result<Option<Apartment>, StoreError> {
        self.inner.get_apartment(flat).await
    }

    async fn get_charge(
        &self,
        flat: FlatNumber,
        period: BillingPeriod,
    ) -> Result<Option<ChargeRecord>, StoreError> {
        self.inner.get_charge(flat, period).await
    }

    async fn charges_for_year(
        &self,
        flat: FlatNumber,
        year: i32,
    ) -> Result<Vec<ChargeRecord>, StoreError> {
        tokio::time::sleep(self.charges_delay).await;
        self.inner.charges_for_year(flat, year).await
    }

    async fn payments_for_flat(
        &self,
        flat: FlatNumber,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        self.inner.payments_for_flat(flat).await
    }

    async fn commit_generation(
        &self,
        charge: &ChargeRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        self.inner.commit_generation(charge, new_balance).await
    }

    async fn commit_payment(
        &self,
        charge: &ChargeRecord,
        payment: &PaymentRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        tokio::time::sleep(self.commit_delay).await;
        self.inner.commit_payment(charge, payment, new_balance).await
    }
}

#[tokio::test]
async fn contended_flat_lock_times_out_with_busy() {
    let memory = scenario_store().await;
    let store = Arc::new(DelayedStore {
        commit_delay: Duration::from_millis(400),
        ..DelayedStore::new(memory)
    });
    let ledger = Arc::new(BillingLedger::new(
        store,
        LedgerConfig::default().lock_timeout(Duration::from_millis(25)),
    ));
    ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let slow = ledger.clone();
    let handle = tokio::spawn(async move {
        slow.record_payment(flat(1), 1, 2024, dec!(100.00), date(2024, 1, 20))
            .await
    });
    // Let the spawned payment take the flat lock and stall in its commit.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = ledger
        .record_payment(flat(1), 1, 2024, dec!(100.00), date(2024, 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Busy { .. }));
    assert!(err.is_retryable());

    // The slow payment itself completes normally.
    let balance = handle.await.unwrap().unwrap();
    assert_eq!(balance, dec!(2550.00));
}

#[tokio::test]
async fn yearly_report_is_a_consistent_snapshot_under_concurrent_payment() {
    let memory = scenario_store().await;
    let store = Arc::new(DelayedStore {
        charges_delay: Duration::from_millis(200),
        ..DelayedStore::new(memory)
    });
    let ledger = Arc::new(BillingLedger::new(store, LedgerConfig::default()));
    ledger.generate_monthly_charges(1, 2024).await.unwrap();

    let reporter = ledger.clone();
    let handle = tokio::spawn(async move { reporter.yearly_report(flat(1), 2024).await });
    // Let the report read the balance and stall before reading the charges.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // This payment serializes behind the report instead of landing between
    // its two reads.
    let balance = ledger
        .record_payment(flat(1), 1, 2024, dec!(1000.00), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(balance, dec!(1650.00));

    let report = handle.await.unwrap().unwrap();
    // Pre-payment snapshot throughout, never a mix of old balance and new
    // paid amounts.
    assert_eq!(report.total_paid, Decimal::ZERO);
    assert_eq!(report.year_end_balance, dec!(2650.00));
    assert_eq!(
        report.year_end_balance,
        report.total_billed - report.total_paid
    );
}
