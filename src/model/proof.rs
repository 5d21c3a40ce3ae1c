//! Proof rounds and customer decisions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::UnknownVariant;

/// Per-round proof status.
///
/// A round is terminal once decided; a `ChangesRequested` round is followed by
/// a new round, not a status change on the old one. `Escalated` is the
/// terminal failure mode of the whole subprocess and is only ever set at
/// creation, when the round threshold is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProofStatus {
    Pending,
    Approved,
    ChangesRequested,
    Escalated,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "PENDING",
            ProofStatus::Approved => "APPROVED",
            ProofStatus::ChangesRequested => "CHANGES_REQUESTED",
            ProofStatus::Escalated => "ESCALATED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "PENDING" => Ok(ProofStatus::Pending),
            "APPROVED" => Ok(ProofStatus::Approved),
            "CHANGES_REQUESTED" => Ok(ProofStatus::ChangesRequested),
            "ESCALATED" => Ok(ProofStatus::Escalated),
            other => Err(UnknownVariant {
                kind: "proof status",
                value: other.to_string(),
            }),
        }
    }
}

/// Customer decision on a pending proof round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProofDecision {
    Approved,
    ChangesRequested,
}

impl ProofDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofDecision::Approved => "approved",
            ProofDecision::ChangesRequested => "changes_requested",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "approved" => Ok(ProofDecision::Approved),
            "changes_requested" => Ok(ProofDecision::ChangesRequested),
            other => Err(UnknownVariant {
                kind: "proof decision",
                value: other.to_string(),
            }),
        }
    }

    /// The proof status this decision lands the round in.
    pub fn proof_status(&self) -> ProofStatus {
        match self {
            ProofDecision::Approved => ProofStatus::Approved,
            ProofDecision::ChangesRequested => ProofStatus::ChangesRequested,
        }
    }
}

/// One rendered preview awaiting customer sign-off.
#[derive(Debug, Clone)]
pub struct Proof {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Starts at 1, strictly increasing per order.
    pub proof_round: i64,
    pub status: ProofStatus,
    /// Opaque reference into the external file store.
    pub file_ref: String,
    pub user_feedback: Option<String>,
    pub admin_notes: Option<String>,
    pub escalation_reason: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one customer decision. One row per decided round,
/// never updated or deleted.
#[derive(Debug, Clone)]
pub struct OrderApproval {
    pub id: Uuid,
    pub order_id: Uuid,
    pub proof_id: Uuid,
    pub decision: ProofDecision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Fields for the approval row written alongside a decision.
#[derive(Debug, Clone)]
pub struct NewApproval {
    pub order_id: Uuid,
    pub decision: ProofDecision,
    pub comments: Option<String>,
}
