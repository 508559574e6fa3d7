//! Charge calculator
//!
//! Pure computation of one apartment's monthly charge from the tariff
//! catalog. No I/O and no side effects, so a regeneration run with the same
//! inputs reproduces the same breakdown to the digit.

use std::collections::BTreeMap;

use ledger_kernel::{round2, ServiceCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::apartment::Apartment;
use crate::error::LedgerError;
use crate::tariff::{Tariff, TariffUnit};

/// The per-service breakdown and total for one apartment and period.
///
/// Breakdown values are rounded to 2 decimal places at computation time, so
/// `total_charge` always equals the rounded sum of the stored breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedCharge {
    /// Charged amount per service code, ordered by code
    pub breakdown: BTreeMap<ServiceCode, Decimal>,
    /// Rounded sum of the breakdown
    pub total_charge: Decimal,
}

/// Computes the monthly charge for one apartment against the tariff catalog.
///
/// # Errors
///
/// - [`LedgerError::InvalidTariff`] when any tariff carries a negative rate
/// - [`LedgerError::InvalidApartment`] when a per-area tariff is present and
///   the apartment's area is not positive
pub fn compute_charge(
    apartment: &Apartment,
    tariffs: &[Tariff],
) -> Result<ComputedCharge, LedgerError> {
    for tariff in tariffs {
        tariff.validate()?;
    }

    let needs_area = tariffs.iter().any(|t| t.unit == TariffUnit::PerArea);
    if needs_area && apartment.area <= Decimal::ZERO {
        return Err(LedgerError::InvalidApartment {
            flat: apartment.flat,
            area: apartment.area,
        });
    }

    let mut breakdown = BTreeMap::new();
    for tariff in tariffs {
        let charge = match tariff.unit {
            TariffUnit::PerArea => round2(tariff.rate * apartment.area),
            TariffUnit::PerUnit => round2(tariff.rate),
        };
        breakdown.insert(tariff.service_code.clone(), charge);
    }

    let total_charge = round2(breakdown.values().copied().sum());

    Ok(ComputedCharge {
        breakdown,
        total_charge,
    })
}
