//! Logging consumer for debugging and testing.

use async_trait::async_trait;
use tracing::info;

use super::{BusResult, DomainEvent, EventConsumer};

/// Consumer that logs all received events.
///
/// Useful for verifying event flow in development before a real
/// notification dispatcher is attached.
pub struct LoggingConsumer {
    name: String,
}

impl LoggingConsumer {
    /// Create a new logging consumer.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EventConsumer for LoggingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consume(&self, event: &DomainEvent) -> BusResult<()> {
        info!(
            consumer = %self.name,
            event.kind = event.kind(),
            event.practice = %event.practice_id(),
            payload = %serde_json::to_string(event).unwrap_or_default(),
            "Event received"
        );
        Ok(())
    }
}
