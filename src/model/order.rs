//! Order entity and the status state machine.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::UnknownVariant;

/// Order production status.
///
/// The transition table lives in [`OrderStatus::can_transition`]; nothing else
/// in the crate decides which transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Draft,
    Pending,
    InProduction,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "draft" => Ok(OrderStatus::Draft),
            "pending" => Ok(OrderStatus::Pending),
            "in_production" => Ok(OrderStatus::InProduction),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }

    /// Terminal states admit no further transitions, including cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// The allowed transition graph.
    ///
    /// draft -> pending -> in_production -> completed, with cancellation
    /// reachable from any non-terminal state. No skips, no re-entry.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, to) {
            (OrderStatus::Draft, OrderStatus::Pending) => true,
            (OrderStatus::Pending, OrderStatus::InProduction) => true,
            (OrderStatus::InProduction, OrderStatus::Completed) => true,
            (_, OrderStatus::Cancelled) => true,
            _ => false,
        }
    }
}

/// Whether entering production requires a customer-approved proof.
///
/// Stored per order rather than inferred, so order/template types with
/// different sign-off requirements stay explicit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ApprovalPolicy {
    /// Production requires the latest proof to exist and be approved.
    RequireApprovedProof,
    /// Production requires only that the latest proof, if any, is approved.
    ProofOptional,
}

impl ApprovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalPolicy::RequireApprovedProof => "require_approved_proof",
            ApprovalPolicy::ProofOptional => "proof_optional",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "require_approved_proof" => Ok(ApprovalPolicy::RequireApprovedProof),
            "proof_optional" => Ok(ApprovalPolicy::ProofOptional),
            other => Err(UnknownVariant {
                kind: "approval policy",
                value: other.to_string(),
            }),
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        ApprovalPolicy::RequireApprovedProof
    }
}

/// A mail-production order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    /// Sequential, assigned by the store at insert.
    pub order_number: i64,
    pub practice_id: Uuid,
    pub user_id: Uuid,
    /// Set when the order came from a quote conversion; never reassigned.
    pub quote_id: Option<Uuid>,
    pub status: OrderStatus,
    pub approval_policy: ApprovalPolicy,
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
    pub production_start_date: Option<NaiveDate>,
    pub production_end_date: Option<NaiveDate>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating an order, directly or from a quote conversion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub practice_id: Uuid,
    pub user_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub approval_policy: ApprovalPolicy,
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(OrderStatus::Draft.can_transition(OrderStatus::Pending));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::InProduction));
        assert!(OrderStatus::InProduction.can_transition(OrderStatus::Completed));
    }

    #[test]
    fn test_no_skips() {
        assert!(!OrderStatus::Draft.can_transition(OrderStatus::InProduction));
        assert!(!OrderStatus::Draft.can_transition(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Completed));
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Draft));
        assert!(!OrderStatus::InProduction.can_transition(OrderStatus::Pending));
    }

    #[test]
    fn test_cancellation_from_non_terminal_only() {
        assert!(OrderStatus::Draft.can_transition(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled));
        assert!(OrderStatus::InProduction.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for target in [
            OrderStatus::Draft,
            OrderStatus::Pending,
            OrderStatus::InProduction,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Completed.can_transition(target));
            assert!(!OrderStatus::Cancelled.can_transition(target));
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            OrderStatus::Draft,
            OrderStatus::Pending,
            OrderStatus::InProduction,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("shipped").is_err());
    }
}
