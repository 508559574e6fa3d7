//! Test data builders
//!
//! Builders let a test state only the fields it cares about and take
//! defaults for the rest.

use domain_ledger::{Apartment, Tariff, TariffUnit};
use ledger_kernel::{FlatNumber, ServiceCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Builder for test apartments.
pub struct ApartmentBuilder {
    flat: u32,
    area: Decimal,
    owner: String,
    balance: Decimal,
}

impl Default for ApartmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApartmentBuilder {
    pub fn new() -> Self {
        Self {
            flat: 1,
            area: dec!(45.0),
            owner: "А.Е. Асанов".to_string(),
            balance: Decimal::ZERO,
        }
    }

    pub fn with_flat(mut self, flat: u32) -> Self {
        self.flat = flat;
        self
    }

    pub fn with_area(mut self, area: Decimal) -> Self {
        self.area = area;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn build(self) -> Apartment {
        let flat = FlatNumber::new(self.flat).expect("builder flat number");
        Apartment::new(flat, self.area, self.owner).with_opening_balance(self.balance)
    }
}

/// Builder for test tariffs.
pub struct TariffBuilder {
    service_code: String,
    name: String,
    unit: TariffUnit,
    rate: Decimal,
}

impl Default for TariffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TariffBuilder {
    pub fn new() -> Self {
        Self {
            service_code: "SD".to_string(),
            name: "Үйді күтіп ұстау".to_string(),
            unit: TariffUnit::PerArea,
            rate: dec!(40),
        }
    }

    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = code.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn per_area(mut self) -> Self {
        self.unit = TariffUnit::PerArea;
        self
    }

    pub fn per_unit(mut self) -> Self {
        self.unit = TariffUnit::PerUnit;
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = rate;
        self
    }

    pub fn build(self) -> Tariff {
        let code = ServiceCode::new(self.service_code).expect("builder service code");
        match self.unit {
            TariffUnit::PerArea => Tariff::per_area(code, self.name, self.rate),
            TariffUnit::PerUnit => Tariff::per_unit(code, self.name, self.rate),
        }
    }
}
