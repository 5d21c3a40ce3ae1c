//! Operational collaborator hooks.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::model::{AuditRecord, Proof};

/// Operational-alert hook for audit writes that were lost after retries.
///
/// Audit failures never fail the business operation, but total silent loss is
/// an alert condition: the default implementation logs the full record so an
/// operator can reconstruct it.
#[async_trait]
pub trait AlertHook: Send + Sync {
    async fn audit_write_lost(&self, record: &AuditRecord, reason: &str);
}

/// Default alert hook: structured error log.
pub struct LoggingAlertHook;

#[async_trait]
impl AlertHook for LoggingAlertHook {
    async fn audit_write_lost(&self, record: &AuditRecord, reason: &str) {
        error!(
            audit.id = %record.id,
            audit.action = record.action.as_str(),
            audit.resource = record.resource.as_str(),
            audit.resource_id = %record.resource_id,
            audit.actor = %record.actor_id,
            reason = %reason,
            "Audit write lost after retries"
        );
    }
}

/// Collaborator hook fired when a proof round escalates.
///
/// Whether escalations land in an admin queue or are polled is the
/// consumer's choice; the core only guarantees the notification.
#[async_trait]
pub trait EscalationHook: Send + Sync {
    async fn proof_escalated(&self, proof: &Proof);
}

/// Default escalation hook: structured warn log.
pub struct LoggingEscalationHook;

#[async_trait]
impl EscalationHook for LoggingEscalationHook {
    async fn proof_escalated(&self, proof: &Proof) {
        warn!(
            proof.id = %proof.id,
            proof.order_id = %proof.order_id,
            proof.round = proof.proof_round,
            reason = proof.escalation_reason.as_deref().unwrap_or("unspecified"),
            "Proof escalated; manual resolution required"
        );
    }
}
