//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Writing or reading the backing store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tenant identifier not known to the registry
    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),

    /// Transaction id not present in the ledger
    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    /// Person id not present in the ledger
    #[error("Person not found: {0}")]
    PersonNotFound(i64),

    /// Two stored documents claim the same tenant identifier
    #[error("Duplicate ledger identifier: {0}")]
    DuplicateLedger(String),

    /// Invariant violation (balance or total mismatch, id collision, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the "unknown tenant / unknown entity" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::LedgerNotFound(_) | Error::TransactionNotFound(_) | Error::PersonNotFound(_)
        )
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Config(format!("metrics registration failed: {}", err))
    }
}
