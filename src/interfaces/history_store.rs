//! Order status history read interface.
//!
//! History rows are written only inside `OrderStore::create` and
//! `OrderStore::transition` transactions; this interface is the read side
//! for support tooling and the replay property.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{CallerScope, StatusChange};

use super::StorageResult;

/// Read access to the per-order status timeline.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All transition rows for an order in append order (oldest first).
    /// Scoped through the owning order's practice.
    async fn list_for_order(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> StorageResult<Vec<StatusChange>>;
}
