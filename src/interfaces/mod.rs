//! Store and collaborator interfaces.
//!
//! Services depend only on these traits; the SQLite implementations live in
//! `storage::sqlite`. Multi-row operations (conversion, transition+history,
//! decision+approval) are single trait methods so implementations can make
//! them atomic.

mod audit_store;
mod history_store;
mod hooks;
mod order_store;
mod proof_store;
mod quote_store;

pub use audit_store::AuditStore;
pub use history_store::HistoryStore;
pub use hooks::{AlertHook, EscalationHook, LoggingAlertHook, LoggingEscalationHook};
pub use order_store::OrderStore;
pub use proof_store::ProofStore;
pub use quote_store::QuoteStore;

use uuid::Uuid;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Row not found: {resource} {id}")]
    NotFound { resource: &'static str, id: Uuid },

    /// Optimistic status guard matched zero rows: the row's status changed
    /// under us, or never was what the caller read.
    #[error("Stale status on {resource} {id}: expected {expected}")]
    StaleStatus {
        resource: &'static str,
        id: Uuid,
        expected: &'static str,
    },

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    #[error("Corrupt row: {0}")]
    CorruptRow(#[from] crate::model::UnknownVariant),

    #[error("Storage operation timed out")]
    Timeout,

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for lifecycle operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// The error taxonomy of the lifecycle core.
///
/// Business-rule violations carry actionable messages; infrastructure
/// failures stay generic and retry-safe for the caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Not found: {resource} {id}")]
    NotFound { resource: &'static str, id: Uuid },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource, id } => CoreError::NotFound { resource, id },
            StorageError::Timeout => CoreError::Timeout,
            other => CoreError::Storage(other),
        }
    }
}
