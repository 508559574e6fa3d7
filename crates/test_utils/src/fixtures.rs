//! Pre-built test data
//!
//! The standard catalog mirrors a real association's tariffs: building
//! maintenance and capital repair priced per square metre, cleaning and
//! video surveillance priced per flat.

use domain_ledger::{Apartment, LedgerStore, Tariff};
use infra_store::MemoryStore;
use ledger_kernel::{FlatNumber, ServiceCode};
use rust_decimal_macros::dec;

fn code(s: &str) -> ServiceCode {
    ServiceCode::new(s).expect("fixture service code")
}

fn flat(n: u32) -> FlatNumber {
    FlatNumber::new(n).expect("fixture flat number")
}

/// The association's standard tariff catalog.
pub fn standard_tariffs() -> Vec<Tariff> {
    vec![
        Tariff::per_area(code("SD"), "Үйді күтіп ұстау", dec!(40)),
        Tariff::per_unit(code("UB"), "Үй іші тазалығы", dec!(850)),
        Tariff::per_unit(code("VN"), "Бейнебақылау", dec!(300)),
        Tariff::per_area(code("KR"), "Күрделі жөндеу", dec!(40)),
    ]
}

/// A small sample roster.
pub fn sample_apartments() -> Vec<Apartment> {
    vec![
        Apartment::new(flat(1), dec!(45.0), "А.Е. Асанов"),
        Apartment::new(flat(2), dec!(60.5), "Б.К. Беріков"),
    ]
}

/// A memory store seeded with the standard catalog and sample roster.
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for tariff in standard_tariffs() {
        store.insert_tariff(&tariff).await.expect("seed tariff");
    }
    for apartment in sample_apartments() {
        store
            .insert_apartment(&apartment)
            .await
            .expect("seed apartment");
    }
    store
}
