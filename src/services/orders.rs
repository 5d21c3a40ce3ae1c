//! Order lifecycle: creation, the status state machine, and the history
//! read API.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::bus::{DomainEvent, EventBus};
use crate::config::TimeoutConfig;
use crate::interfaces::{
    CoreError, CoreResult, HistoryStore, OrderStore, ProofStore, StorageError,
};
use crate::model::{
    ApprovalPolicy, AuditAction, AuditRecord, AuditResource, AuditSeverity, CallerScope, NewOrder,
    Order, OrderStatus, ProofStatus, StatusChange, StatusChangeInput,
};

use super::{with_timeout, AuditRecorder};

/// Caller-supplied fields for a directly created order.
#[derive(Debug, Clone)]
pub struct NewOrderInput {
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
    pub approval_policy: ApprovalPolicy,
}

/// Order operations.
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    proofs: Arc<dyn ProofStore>,
    history: Arc<dyn HistoryStore>,
    audit: Arc<AuditRecorder>,
    bus: Arc<dyn EventBus>,
    timeouts: TimeoutConfig,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        proofs: Arc<dyn ProofStore>,
        history: Arc<dyn HistoryStore>,
        audit: Arc<AuditRecorder>,
        bus: Arc<dyn EventBus>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            orders,
            proofs,
            history,
            audit,
            bus,
            timeouts,
        }
    }

    /// Create a draft order directly (no quote).
    #[instrument(skip(self, input), fields(practice = ?scope.practice_id))]
    pub async fn create_order(
        &self,
        scope: &CallerScope,
        input: NewOrderInput,
    ) -> CoreResult<Order> {
        let practice_id = scope.practice_id.ok_or_else(|| {
            CoreError::Validation("a practice is required to create an order".to_string())
        })?;
        if input.service_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "service type is required".to_string(),
            ));
        }
        if input.recipient_count <= 0 {
            return Err(CoreError::Validation(
                "recipient count must be positive".to_string(),
            ));
        }

        let order = with_timeout(
            self.timeouts.storage(),
            self.orders.create(
                NewOrder {
                    practice_id,
                    user_id: scope.user_id,
                    quote_id: None,
                    approval_policy: input.approval_policy,
                    service_type: input.service_type,
                    recipient_count: input.recipient_count,
                    total_cost_cents: input.total_cost_cents,
                },
                StatusChangeInput {
                    changed_by: scope.user_id,
                    changed_by_role: scope.role,
                    comments: None,
                    metadata: None,
                },
            ),
        )
        .await?;

        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Create,
                AuditResource::Order,
                order.id,
                AuditSeverity::Info,
                true,
                None,
            ))
            .await;

        info!(order.id = %order.id, order.number = order.order_number, "Order created");
        Ok(order)
    }

    /// Fetch one order visible to the scope.
    pub async fn get_order(&self, scope: &CallerScope, id: Uuid) -> CoreResult<Order> {
        with_timeout(self.timeouts.storage(), self.orders.get(scope, id)).await
    }

    /// List orders visible to the scope.
    pub async fn list_orders(&self, scope: &CallerScope) -> CoreResult<Vec<Order>> {
        with_timeout(self.timeouts.storage(), self.orders.list(scope)).await
    }

    /// Move an order to `target`.
    ///
    /// The attempt is audited regardless of outcome, so rejected transitions
    /// stay visible in the compliance trail. On success the order update and
    /// its history row commit atomically and `order.status_changed` fires.
    #[instrument(skip(self, comments), fields(practice = ?scope.practice_id))]
    pub async fn transition(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
        target: OrderStatus,
        comments: Option<String>,
    ) -> CoreResult<Order> {
        let outcome = self
            .transition_inner(scope, order_id, target, comments)
            .await;

        let (success, severity, detail) = match &outcome {
            Ok((from, _)) => (
                true,
                AuditSeverity::Info,
                Some(format!("{} -> {}", from.as_str(), target.as_str())),
            ),
            Err(err) => (false, AuditSeverity::Warning, Some(err.to_string())),
        };
        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Update,
                AuditResource::Order,
                order_id,
                severity,
                success,
                detail,
            ))
            .await;

        match outcome {
            Ok((from, order)) => {
                self.bus
                    .publish(Arc::new(DomainEvent::OrderStatusChanged {
                        order_id: order.id,
                        practice_id: order.practice_id,
                        from,
                        to: target,
                    }))
                    .await;
                info!(
                    order.id = %order.id,
                    from = from.as_str(),
                    to = target.as_str(),
                    "Order status changed"
                );
                Ok(order)
            }
            Err(err) => Err(err),
        }
    }

    async fn transition_inner(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
        target: OrderStatus,
        comments: Option<String>,
    ) -> CoreResult<(OrderStatus, Order)> {
        let order = self.get_order(scope, order_id).await?;
        if !scope.owns(order.practice_id) {
            return Err(CoreError::Forbidden(
                "order belongs to another practice".to_string(),
            ));
        }

        let from = order.status;
        if !from.can_transition(target) {
            return Err(CoreError::InvalidTransition {
                from: from.as_str(),
                to: target.as_str(),
            });
        }

        if target == OrderStatus::InProduction {
            self.check_approval_policy(&order).await?;
        }

        let change = StatusChangeInput {
            changed_by: scope.user_id,
            changed_by_role: scope.role,
            comments,
            metadata: None,
        };

        match with_timeout(
            self.timeouts.storage(),
            self.orders.transition(order_id, from, target, change),
        )
        .await
        {
            Ok(updated) => Ok((from, updated)),
            // The optimistic guard lost to a concurrent writer; the caller
            // should re-read and re-decide.
            Err(CoreError::Storage(StorageError::StaleStatus { .. })) => Err(
                CoreError::InvalidState("order status changed concurrently".to_string()),
            ),
            Err(err) => Err(err),
        }
    }

    /// Enforce the per-order proof sign-off policy for entering production.
    async fn check_approval_policy(&self, order: &Order) -> CoreResult<()> {
        let latest = with_timeout(
            self.timeouts.storage(),
            self.proofs.latest_for_order(order.id),
        )
        .await?;

        let blocked = CoreError::InvalidTransition {
            from: order.status.as_str(),
            to: OrderStatus::InProduction.as_str(),
        };

        match (order.approval_policy, latest) {
            // The most recent proof, whatever the policy, must be approved.
            (_, Some(proof)) if proof.status == ProofStatus::Approved => Ok(()),
            (_, Some(_)) => Err(blocked),
            (ApprovalPolicy::ProofOptional, None) => Ok(()),
            (ApprovalPolicy::RequireApprovedProof, None) => Err(blocked),
        }
    }

    /// Per-order status timeline for support/UI.
    pub async fn get_order_history(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> CoreResult<Vec<StatusChange>> {
        // Scoped read of the order first, so an out-of-practice caller gets
        // NotFound instead of an empty timeline.
        let _ = self.get_order(scope, order_id).await?;
        with_timeout(
            self.timeouts.storage(),
            self.history.list_for_order(scope, order_id),
        )
        .await
    }
}
