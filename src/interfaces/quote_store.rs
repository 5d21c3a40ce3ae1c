//! Quote persistence interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{CallerScope, NewOrder, NewQuote, Order, Quote, StatusChangeInput};

use super::StorageResult;

/// Interface for quote persistence and the one-way quote-to-order conversion.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Insert a new pending quote, assigning the next sequential quote number.
    async fn create(&self, quote: NewQuote) -> StorageResult<Quote>;

    /// Fetch one quote visible to the scope. Rows outside the scope's
    /// practice read as absent, never as someone else's row.
    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Quote>;

    /// List quotes visible to the scope, newest first.
    async fn list(&self, scope: &CallerScope) -> StorageResult<Vec<Quote>>;

    /// Archive a pending quote.
    async fn archive(&self, id: Uuid) -> StorageResult<Quote>;

    /// Convert a pending quote into a draft order in one transaction.
    ///
    /// Inserts the order (next sequential order number, `quote_id` pointing
    /// back) with its creation history row, then flips the quote to
    /// converted with `converted_order_id` set, guarded by `WHERE status =
    /// 'pending'`. A stale guard rolls the whole transaction back with
    /// `StorageError::StaleStatus`; partial application is never observable.
    async fn convert(
        &self,
        quote_id: Uuid,
        order: NewOrder,
        change: StatusChangeInput,
    ) -> StorageResult<(Quote, Order)>;
}
