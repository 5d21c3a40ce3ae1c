//! Proof round and approval persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{CallerScope, NewApproval, OrderApproval, Proof, ProofStatus};

use super::StorageResult;

/// Interface for proof rounds and their append-only decision records.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Insert a proof round. The caller decides round number and initial
    /// status (PENDING, or ESCALATED past the round threshold).
    async fn create_round(
        &self,
        order_id: Uuid,
        proof_round: i64,
        status: ProofStatus,
        file_ref: String,
        admin_notes: Option<String>,
        escalation_reason: Option<String>,
    ) -> StorageResult<Proof>;

    /// Fetch one proof visible to the scope (scoped through its order's
    /// practice).
    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Proof>;

    /// The order's highest round, if any rounds exist.
    async fn latest_for_order(&self, order_id: Uuid) -> StorageResult<Option<Proof>>;

    /// All rounds for an order, ascending by round.
    async fn list_for_order(&self, scope: &CallerScope, order_id: Uuid)
        -> StorageResult<Vec<Proof>>;

    /// Record a customer decision in one transaction: flip the proof from
    /// PENDING to the decided status (optimistic `WHERE status = 'PENDING'`)
    /// and insert the immutable approval row.
    ///
    /// A proof no longer PENDING rolls back with `StorageError::StaleStatus`,
    /// which guarantees at most one approval row per round under concurrent
    /// submissions.
    async fn record_decision(
        &self,
        proof_id: Uuid,
        status: ProofStatus,
        user_feedback: Option<String>,
        responded_at: DateTime<Utc>,
        approval: NewApproval,
    ) -> StorageResult<(Proof, OrderApproval)>;

    /// Approval rows for an order, ascending by decision time.
    async fn approvals_for_order(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> StorageResult<Vec<OrderApproval>>;
}
