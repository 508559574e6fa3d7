//! Storage adapters for the billing ledger
//!
//! Implements the `domain_ledger::LedgerStore` port twice:
//!
//! - [`MemoryStore`]: lock-guarded maps, used by the test suite and for
//!   fault-injection of the commit paths
//! - [`SqliteStore`]: SQLite via SQLx with runtime-bound queries; the two
//!   commit methods run inside database transactions so the charge, payment,
//!   and balance writes land together or not at all
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_store::{SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::connect(StoreConfig::new("sqlite://ledger.db")).await?;
//! let ledger = BillingLedger::new(Arc::new(store), LedgerConfig::default());
//! ```

pub mod memory;
pub mod pool;
pub mod sqlite;

pub use memory::MemoryStore;
pub use pool::{create_pool, StoreConfig, StorePool};
pub use sqlite::SqliteStore;
