//! Outbound domain events.
//!
//! The lifecycle core emits events after its transactions commit; an external
//! notification dispatcher consumes them for email. Delivery failures are a
//! consumer concern and never fail the publisher.

mod in_process;
mod logging;

pub use in_process::InProcessEventBus;
pub use logging::LoggingConsumer;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{OrderStatus, ProofDecision};

/// Result type for bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Errors that can occur during event delivery.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Consumer '{name}' failed: {reason}")]
    ConsumerFailed { name: String, reason: String },
}

/// A domain event emitted by the lifecycle core.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    #[serde(rename = "order.status_changed")]
    OrderStatusChanged {
        order_id: Uuid,
        practice_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[serde(rename = "proof.decided")]
    ProofDecided {
        proof_id: Uuid,
        order_id: Uuid,
        practice_id: Uuid,
        proof_round: i64,
        decision: ProofDecision,
    },
    #[serde(rename = "quote.converted")]
    QuoteConverted {
        quote_id: Uuid,
        order_id: Uuid,
        practice_id: Uuid,
    },
}

impl DomainEvent {
    /// Stable event name consumed by dispatchers.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::OrderStatusChanged { .. } => "order.status_changed",
            DomainEvent::ProofDecided { .. } => "proof.decided",
            DomainEvent::QuoteConverted { .. } => "quote.converted",
        }
    }

    /// Practice the event belongs to.
    pub fn practice_id(&self) -> Uuid {
        match self {
            DomainEvent::OrderStatusChanged { practice_id, .. }
            | DomainEvent::ProofDecided { practice_id, .. }
            | DomainEvent::QuoteConverted { practice_id, .. } => *practice_id,
        }
    }
}

/// Handler for events delivered by the bus.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Consumer name, for logs.
    fn name(&self) -> &str;

    /// Process one event.
    async fn consume(&self, event: &DomainEvent) -> BusResult<()>;
}

/// Interface for event delivery to consumers.
///
/// The event is wrapped in Arc to enforce immutability during distribution;
/// all consumers receive a reference to the same data.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one event to all registered consumers.
    async fn publish(&self, event: Arc<DomainEvent>);
}
