//! Order persistence interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{CallerScope, NewOrder, Order, OrderStatus, StatusChangeInput};

use super::StorageResult;

/// Interface for order persistence and the atomic transition+history write.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new draft order with the next sequential order number, and
    /// append its creation history row in the same transaction.
    async fn create(&self, order: NewOrder, change: StatusChangeInput) -> StorageResult<Order>;

    /// Fetch one order visible to the scope.
    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Order>;

    /// List orders visible to the scope, newest first.
    async fn list(&self, scope: &CallerScope) -> StorageResult<Vec<Order>>;

    /// Move an order from `from` to `to` and append the matching history row
    /// in one transaction; both commit or neither.
    ///
    /// The update is guarded by `WHERE status = from`; a concurrent writer
    /// that got there first surfaces as `StorageError::StaleStatus` with the
    /// transaction rolled back. Status side effects (production start date,
    /// fulfilled_at) are applied by the implementation based on `to`.
    async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        change: StatusChangeInput,
    ) -> StorageResult<Order>;
}
