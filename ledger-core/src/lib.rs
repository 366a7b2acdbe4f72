//! Splitledger Core
//!
//! Multi-tenant shared-expense ledger: each tenant owns people, transactions
//! and payments, and payments accumulate into per-person balances.
//!
//! # Architecture
//!
//! - **Ledger**: one tenant's state behind a reader/writer lock
//! - **Write-through**: every mutation saves the whole snapshot before returning
//! - **Registry**: fixed set of ledgers loaded from a directory at startup
//!
//! # Invariants
//!
//! - Balance consistency: balance(p) == Σ amount of p's payments
//! - Total consistency: total(t) == Σ positive amounts of t's payments
//! - Person and transaction ids come from one counter and never collide
//! - Payments live and die with their transaction

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod snapshot;
pub mod storage;
pub mod ledger;
pub mod registry;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Account, Amount, EntityId, Payment, PaymentInput, Person, Transaction, TransactionUpsert,
};
pub use snapshot::LedgerState;
pub use storage::{JsonFileStore, MemoryStore, SnapshotStore};
pub use ledger::Ledger;
pub use registry::Registry;
pub use config::{Config, WriteMode};
pub use metrics::Metrics;
