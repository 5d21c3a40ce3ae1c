//! In-process event bus implementation.
//!
//! Routes events directly to registered consumers without network overhead.
//! Consumer failures are logged and never propagate to the publisher, so a
//! broken notification dispatcher cannot fail a committed business operation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{DomainEvent, EventBus, EventConsumer};

/// In-process event bus.
///
/// Ideal for single-process deployments and tests; a message-broker
/// implementation would slot in behind the same trait.
pub struct InProcessEventBus {
    consumers: RwLock<Vec<Arc<dyn EventConsumer>>>,
}

impl InProcessEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            consumers: RwLock::new(Vec::new()),
        }
    }

    /// Register a consumer.
    pub async fn add_consumer(&self, consumer: Box<dyn EventConsumer>) {
        let consumer: Arc<dyn EventConsumer> = consumer.into();
        info!(consumer.name = %consumer.name(), "Registered event consumer");
        self.consumers.write().await.push(consumer);
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, event: Arc<DomainEvent>) {
        // Collect under read lock, release before the async consumer calls.
        let consumer_list: Vec<_> = self.consumers.read().await.iter().cloned().collect();

        debug!(
            event.kind = event.kind(),
            consumers = consumer_list.len(),
            "Publishing domain event"
        );

        for consumer in consumer_list {
            if let Err(err) = consumer.consume(&event).await {
                warn!(
                    consumer.name = %consumer.name(),
                    event.kind = event.kind(),
                    error = %err,
                    "Event consumer failed; continuing"
                );
            }
        }
    }
}
