//! Test utilities for the billing ledger suite
//!
//! - `fixtures`: the association's standard tariff catalog and a small
//!   sample roster
//! - `builders`: builder types for apartments and tariffs with sensible
//!   defaults

pub mod builders;
pub mod fixtures;

pub use builders::{ApartmentBuilder, TariffBuilder};
pub use fixtures::{sample_apartments, seeded_store, standard_tariffs};
