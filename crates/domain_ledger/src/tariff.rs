//! Tariff catalog types
//!
//! A tariff is one billable service with a rate and a computation unit.
//! Tariffs are read-mostly configuration: edited between billing runs, read
//! by the charge calculator.

use ledger_kernel::ServiceCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// How a tariff's rate is applied to an apartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffUnit {
    /// Rate is multiplied by the apartment's area (тг/м²)
    PerArea,
    /// Flat rate per apartment, independent of area (тг/пәтер)
    PerUnit,
}

/// A billable service rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    /// Stable service identifier, e.g. `SD`, `KR`
    pub service_code: ServiceCode,
    /// Human-readable service name
    pub name: String,
    /// Computation unit
    pub unit: TariffUnit,
    /// Non-negative rate in tenge
    pub rate: Decimal,
}

impl Tariff {
    /// Creates a per-area tariff (тг/м²).
    pub fn per_area(service_code: ServiceCode, name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            service_code,
            name: name.into(),
            unit: TariffUnit::PerArea,
            rate,
        }
    }

    /// Creates a flat per-unit tariff (тг/пәтер).
    pub fn per_unit(service_code: ServiceCode, name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            service_code,
            name: name.into(),
            unit: TariffUnit::PerUnit,
            rate,
        }
    }

    /// Rejects negative rates before they reach a billing run.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.rate.is_sign_negative() {
            return Err(LedgerError::InvalidTariff {
                service_code: self.service_code.clone(),
                rate: self.rate,
            });
        }
        Ok(())
    }
}
