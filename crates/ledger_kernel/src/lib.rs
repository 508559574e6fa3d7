//! Ledger Kernel - Foundational types for the OSI billing ledger
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure layers:
//! - Monetary rounding and tenge formatting helpers
//! - Billing periods (month/year) with validation and ordering
//! - Strongly-typed identifiers for flats, services, and payments

pub mod identifiers;
pub mod money;
pub mod period;

pub use identifiers::{FlatNumber, IdentifierError, PaymentId, ServiceCode};
pub use money::{format_tenge, round2};
pub use period::{BillingPeriod, PeriodError};
