//! Lifecycle services: the operations the core exposes.
//!
//! Each service is a thin request-scoped coordinator over the store traits:
//! tenancy guard, business-rule validation, the atomic store call, then audit
//! and event emission. No service holds mutable state; all coordination goes
//! through the transactional store, so instances are freely shareable.

mod audit;
mod orders;
mod proofs;
mod quotes;

pub use audit::AuditRecorder;
pub use orders::{NewOrderInput, OrderService};
pub use proofs::ProofService;
pub use quotes::{NewQuoteInput, QuoteService};

use std::future::Future;
use std::time::Duration;

use crate::interfaces::{CoreError, CoreResult, StorageResult};

/// Run one storage call under the configured budget.
///
/// Elapsing the budget fails the primary operation with `Timeout`; the
/// underlying call is dropped with its transaction, which rolls back.
pub(crate) async fn with_timeout<T>(
    budget: Duration,
    fut: impl Future<Output = StorageResult<T>>,
) -> CoreResult<T> {
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout),
    }
}
