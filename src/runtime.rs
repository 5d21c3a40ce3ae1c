//! Single-process runtime: wires the SQLite stores, the bus, and the
//! lifecycle services together from one config.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::bus::{EventBus, EventConsumer, InProcessEventBus};
use crate::config::CoreConfig;
use crate::interfaces::{
    AlertHook, EscalationHook, LoggingAlertHook, LoggingEscalationHook, StorageResult,
};
use crate::services::{AuditRecorder, OrderService, ProofService, QuoteService};
use crate::storage::{
    init_schema, SqliteAuditStore, SqliteHistoryStore, SqliteOrderStore, SqliteProofStore,
    SqliteQuoteStore,
};

/// Builder for a [`Runtime`].
pub struct RuntimeBuilder {
    config: CoreConfig,
    alert: Arc<dyn AlertHook>,
    escalation: Arc<dyn EscalationHook>,
    consumers: Vec<Box<dyn EventConsumer>>,
}

impl RuntimeBuilder {
    /// Start from a config, with logging hooks as defaults.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            alert: Arc::new(LoggingAlertHook),
            escalation: Arc::new(LoggingEscalationHook),
            consumers: Vec::new(),
        }
    }

    /// Replace the operational alert hook.
    pub fn with_alert_hook(mut self, hook: Arc<dyn AlertHook>) -> Self {
        self.alert = hook;
        self
    }

    /// Replace the proof escalation hook.
    pub fn with_escalation_hook(mut self, hook: Arc<dyn EscalationHook>) -> Self {
        self.escalation = hook;
        self
    }

    /// Attach an event consumer (e.g. the notification dispatcher).
    pub fn with_consumer(mut self, consumer: Box<dyn EventConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Connect, create the schema, and assemble the services.
    pub async fn build(self) -> StorageResult<Runtime> {
        let pool = SqlitePool::connect(&self.config.storage.url).await?;
        self.build_with_pool(pool).await
    }

    /// Assemble over an existing pool, creating the schema if needed.
    pub async fn build_with_pool(self, pool: SqlitePool) -> StorageResult<Runtime> {
        init_schema(&pool).await?;

        let bus = Arc::new(InProcessEventBus::new());
        for consumer in self.consumers {
            bus.add_consumer(consumer).await;
        }
        let bus: Arc<dyn EventBus> = bus;

        let audit = Arc::new(AuditRecorder::new(
            Arc::new(SqliteAuditStore::new(pool.clone())),
            self.alert,
            self.config.audit.clone(),
            self.config.timeouts.clone(),
        ));

        let orders = Arc::new(SqliteOrderStore::new(pool.clone()));
        let proofs = Arc::new(SqliteProofStore::new(pool.clone()));

        let order_service = Arc::new(OrderService::new(
            orders.clone(),
            proofs.clone(),
            Arc::new(SqliteHistoryStore::new(pool.clone())),
            audit.clone(),
            bus.clone(),
            self.config.timeouts.clone(),
        ));

        let quote_service = Arc::new(QuoteService::new(
            Arc::new(SqliteQuoteStore::new(pool.clone())),
            audit.clone(),
            bus.clone(),
            self.config.timeouts.clone(),
        ));

        let proof_service = Arc::new(ProofService::new(
            proofs,
            orders,
            order_service.clone(),
            self.escalation,
            audit.clone(),
            bus.clone(),
            self.config.proof.clone(),
            self.config.timeouts.clone(),
        ));

        Ok(Runtime {
            pool,
            quotes: quote_service,
            orders: order_service,
            proofs: proof_service,
            audit,
        })
    }
}

/// Assembled lifecycle core for a single process.
pub struct Runtime {
    pool: SqlitePool,
    pub quotes: Arc<QuoteService>,
    pub orders: Arc<OrderService>,
    pub proofs: Arc<ProofService>,
    pub audit: Arc<AuditRecorder>,
}

impl Runtime {
    /// Builder with the given config.
    pub fn builder(config: CoreConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    /// The underlying pool, for migrations or test fixtures.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
