//! Billing Ledger Domain - monthly charges and payments for a homeowners' association
//!
//! This crate implements the billing core for one association (OSI): a
//! tariff catalog priced per square metre or per flat, an apartment registry
//! with running balances, and a ledger that generates one charge record per
//! apartment and month, records payments against those charges, and keeps
//! the balance invariant
//!
//! ```text
//! balance == opening_balance + Σ total_charge − Σ paid_amount
//! ```
//!
//! intact across concurrent operations.
//!
//! # Components
//!
//! - [`calculator`]: pure per-tariff charge computation
//! - [`ledger`]: the stateful [`BillingLedger`] service with per-apartment
//!   locking and atomic commits
//! - [`report`]: read-only yearly summaries
//! - [`store`]: the storage port implemented by `infra_store` adapters
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{BillingLedger, LedgerConfig};
//!
//! let ledger = BillingLedger::new(store, LedgerConfig::default());
//! let charges = ledger.generate_monthly_charges(1, 2024).await?;
//! let balance = ledger.record_payment(flat, 1, 2024, amount, date).await?;
//! ```

pub mod apartment;
pub mod calculator;
pub mod charge;
pub mod error;
pub mod ledger;
pub mod report;
pub mod store;
pub mod tariff;

pub use apartment::Apartment;
pub use calculator::{compute_charge, ComputedCharge};
pub use charge::{ChargeRecord, ChargeStatus, PaymentRecord};
pub use error::LedgerError;
pub use ledger::{BillingLedger, LedgerConfig};
pub use report::YearlyReport;
pub use store::{LedgerStore, StoreError};
pub use tariff::{Tariff, TariffUnit};
