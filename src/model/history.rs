//! Per-order status history: the append-only domain timeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{OrderStatus, Role};

/// One immutable status-transition record. Rows are only ever appended,
/// inside the same transaction as the order update they mirror.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    /// None for the creation record.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub changed_by: Uuid,
    pub changed_by_role: Role,
    pub comments: Option<String>,
    /// Free-form request metadata (origin, client info).
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller for the history row of a transition.
#[derive(Debug, Clone)]
pub struct StatusChangeInput {
    pub changed_by: Uuid,
    pub changed_by_role: Role,
    pub comments: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Replay a history timeline to the status it ends at.
///
/// For a consistent store this reproduces the order's current status; the
/// compliance tests assert exactly that.
pub fn replay_history(rows: &[StatusChange]) -> Option<OrderStatus> {
    rows.last().map(|row| row.to_status)
}
