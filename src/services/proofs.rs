//! Proof revision rounds, customer decisions, and escalation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::bus::{DomainEvent, EventBus};
use crate::config::{ProofConfig, TimeoutConfig};
use crate::interfaces::{
    CoreError, CoreResult, EscalationHook, OrderStore, ProofStore, StorageError,
};
use crate::model::{
    AuditAction, AuditRecord, AuditResource, AuditSeverity, CallerScope, NewApproval, Order,
    OrderApproval, OrderStatus, Proof, ProofDecision, ProofStatus, Role,
};

use super::{with_timeout, AuditRecorder, OrderService};

/// Proof subprocess operations.
pub struct ProofService {
    proofs: Arc<dyn ProofStore>,
    orders: Arc<dyn OrderStore>,
    order_service: Arc<OrderService>,
    escalation: Arc<dyn EscalationHook>,
    audit: Arc<AuditRecorder>,
    bus: Arc<dyn EventBus>,
    proof_config: ProofConfig,
    timeouts: TimeoutConfig,
}

impl ProofService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        proofs: Arc<dyn ProofStore>,
        orders: Arc<dyn OrderStore>,
        order_service: Arc<OrderService>,
        escalation: Arc<dyn EscalationHook>,
        audit: Arc<AuditRecorder>,
        bus: Arc<dyn EventBus>,
        proof_config: ProofConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            proofs,
            orders,
            order_service,
            escalation,
            audit,
            bus,
            proof_config,
            timeouts,
        }
    }

    /// Fetch one proof visible to the scope.
    pub async fn get_proof(&self, scope: &CallerScope, id: Uuid) -> CoreResult<Proof> {
        with_timeout(self.timeouts.storage(), self.proofs.get(scope, id)).await
    }

    /// All rounds for an order, ascending.
    pub async fn list_proofs(&self, scope: &CallerScope, order_id: Uuid) -> CoreResult<Vec<Proof>> {
        with_timeout(
            self.timeouts.storage(),
            self.proofs.list_for_order(scope, order_id),
        )
        .await
    }

    /// Decision records for an order, ascending.
    pub async fn list_approvals(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> CoreResult<Vec<OrderApproval>> {
        with_timeout(
            self.timeouts.storage(),
            self.proofs.approvals_for_order(scope, order_id),
        )
        .await
    }

    /// Upload the next proof round for an order. Admin only.
    ///
    /// The first upload opens round 1; after a changes-requested round the
    /// next upload opens the following round, unless that round would exceed
    /// the configured threshold, in which case the proof is created escalated
    /// and the escalation hook fires instead of a new pending round.
    #[instrument(skip(self, file_ref, admin_notes), fields(practice = ?scope.practice_id))]
    pub async fn upload_proof(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
        file_ref: String,
        admin_notes: Option<String>,
    ) -> CoreResult<Proof> {
        if !matches!(scope.role, Role::Admin | Role::Superuser) {
            return Err(CoreError::Forbidden(
                "only admins can upload proofs".to_string(),
            ));
        }
        if file_ref.trim().is_empty() {
            return Err(CoreError::Validation("a proof file is required".to_string()));
        }

        let order = self.get_order_for_write(scope, order_id).await?;
        if order.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "cannot upload a proof for a {} order",
                order.status.as_str()
            )));
        }

        let latest = with_timeout(
            self.timeouts.storage(),
            self.proofs.latest_for_order(order_id),
        )
        .await?;

        let next_round = match &latest {
            None => 1,
            Some(prev) => match prev.status {
                ProofStatus::Pending => {
                    return Err(CoreError::InvalidState(
                        "a proof is already awaiting a decision for this order".to_string(),
                    ))
                }
                ProofStatus::Approved => {
                    return Err(CoreError::InvalidState(
                        "the latest proof is already approved".to_string(),
                    ))
                }
                ProofStatus::Escalated => {
                    return Err(CoreError::InvalidState(
                        "proof process is escalated; manual resolution required".to_string(),
                    ))
                }
                ProofStatus::ChangesRequested => prev.proof_round + 1,
            },
        };

        let escalated = next_round > self.proof_config.max_rounds;
        let (status, reason) = if escalated {
            (
                ProofStatus::Escalated,
                Some(format!(
                    "revision round threshold of {} exceeded",
                    self.proof_config.max_rounds
                )),
            )
        } else {
            (ProofStatus::Pending, None)
        };

        let proof = with_timeout(
            self.timeouts.storage(),
            self.proofs
                .create_round(order_id, next_round, status, file_ref, admin_notes, reason),
        )
        .await?;

        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Create,
                AuditResource::Proof,
                proof.id,
                if escalated {
                    AuditSeverity::Warning
                } else {
                    AuditSeverity::Info
                },
                true,
                Some(format!("round {}", next_round)),
            ))
            .await;

        if escalated {
            self.escalation.proof_escalated(&proof).await;
        } else {
            info!(
                proof.id = %proof.id,
                order.id = %order_id,
                round = next_round,
                "Proof round opened"
            );
        }

        Ok(proof)
    }

    /// Record the customer's decision on a pending proof.
    ///
    /// Duplicate or concurrent submissions are safe: the store's optimistic
    /// PENDING guard admits exactly one decision per round, and everything
    /// else fails `Forbidden` without a second approval row. An approval
    /// opportunistically attempts the order's pending -> in_production
    /// transition.
    #[instrument(skip(self, comments), fields(practice = ?scope.practice_id))]
    pub async fn record_decision(
        &self,
        scope: &CallerScope,
        proof_id: Uuid,
        decision: ProofDecision,
        comments: Option<String>,
    ) -> CoreResult<(Proof, OrderApproval)> {
        let outcome = self
            .record_decision_inner(scope, proof_id, decision, comments)
            .await;

        let (success, severity, detail) = match &outcome {
            Ok((proof, _, _)) => (
                true,
                AuditSeverity::Info,
                Some(format!("round {}", proof.proof_round)),
            ),
            Err(err) => (false, AuditSeverity::Warning, Some(err.to_string())),
        };
        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Decide,
                AuditResource::Proof,
                proof_id,
                severity,
                success,
                detail,
            ))
            .await;

        let (proof, approval, practice_id) = outcome?;

        self.bus
            .publish(Arc::new(DomainEvent::ProofDecided {
                proof_id: proof.id,
                order_id: proof.order_id,
                practice_id,
                proof_round: proof.proof_round,
                decision,
            }))
            .await;

        if decision == ProofDecision::Approved {
            self.attempt_production_start(scope, proof.order_id).await;
        }

        info!(
            proof.id = %proof.id,
            round = proof.proof_round,
            decision = decision.as_str(),
            "Proof decision recorded"
        );
        Ok((proof, approval))
    }

    async fn record_decision_inner(
        &self,
        scope: &CallerScope,
        proof_id: Uuid,
        decision: ProofDecision,
        comments: Option<String>,
    ) -> CoreResult<(Proof, OrderApproval, Uuid)> {
        let proof = self.get_proof(scope, proof_id).await?;
        let order = self.get_order_for_write(scope, proof.order_id).await?;

        if proof.status != ProofStatus::Pending {
            return Err(CoreError::Forbidden(format!(
                "proof round {} is not awaiting a decision",
                proof.proof_round
            )));
        }

        let comments = comments.filter(|c| !c.trim().is_empty());
        if decision == ProofDecision::ChangesRequested && comments.is_none() {
            return Err(CoreError::Validation(
                "feedback is required to request changes".to_string(),
            ));
        }

        let feedback = match decision {
            ProofDecision::ChangesRequested => comments.clone(),
            ProofDecision::Approved => None,
        };

        match with_timeout(
            self.timeouts.storage(),
            self.proofs.record_decision(
                proof_id,
                decision.proof_status(),
                feedback,
                Utc::now(),
                NewApproval {
                    order_id: proof.order_id,
                    decision,
                    comments,
                },
            ),
        )
        .await
        {
            Ok((proof, approval)) => Ok((proof, approval, order.practice_id)),
            // A concurrent decision won the PENDING guard; same outcome as a
            // late duplicate, and no second approval row exists.
            Err(CoreError::Storage(StorageError::StaleStatus { .. })) => {
                Err(CoreError::Forbidden(format!(
                    "proof round {} is not awaiting a decision",
                    proof.proof_round
                )))
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort follow-up after an approval: a pending order moves to
    /// production. Orders in any other state are left alone.
    async fn attempt_production_start(&self, scope: &CallerScope, order_id: Uuid) {
        match self
            .order_service
            .transition(
                scope,
                order_id,
                OrderStatus::InProduction,
                Some("proof approved".to_string()),
            )
            .await
        {
            Ok(_) => {}
            Err(CoreError::InvalidTransition { from, .. }) => {
                debug!(
                    order.id = %order_id,
                    from = from,
                    "Order not pending; production start skipped"
                );
            }
            Err(CoreError::InvalidState(reason)) => {
                debug!(order.id = %order_id, reason = %reason, "Production start skipped");
            }
            Err(err) => {
                warn!(
                    order.id = %order_id,
                    error = %err,
                    "Post-approval production start failed"
                );
            }
        }
    }

    async fn get_order_for_write(&self, scope: &CallerScope, order_id: Uuid) -> CoreResult<Order> {
        let order = with_timeout(self.timeouts.storage(), self.orders.get(scope, order_id)).await?;
        if !scope.owns(order.practice_id) {
            return Err(CoreError::Forbidden(
                "order belongs to another practice".to_string(),
            ));
        }
        Ok(order)
    }
}
