//! Shared fixtures for integration tests.
//!
//! Uses an in-memory SQLite database, no external dependencies required.
//! The pool is pinned to one connection so every test sees one database.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use carepost::bus::{BusResult, DomainEvent, EventConsumer};
use carepost::config::CoreConfig;
use carepost::model::{ApprovalPolicy, CallerScope, Role};
use carepost::runtime::Runtime;
use carepost::services::{NewOrderInput, NewQuoteInput};

/// Event consumer that collects everything it sees.
pub struct CollectingConsumer {
    pub seen: Arc<Mutex<Vec<DomainEvent>>>,
}

#[async_trait]
impl EventConsumer for CollectingConsumer {
    fn name(&self) -> &str {
        "collector"
    }

    async fn consume(&self, event: &DomainEvent) -> BusResult<()> {
        self.seen.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Build a runtime over a fresh in-memory database, returning the sink of
/// collected events alongside it.
pub async fn runtime() -> (Runtime, Arc<Mutex<Vec<DomainEvent>>>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = Runtime::builder(CoreConfig::default())
        .with_consumer(Box::new(CollectingConsumer { seen: seen.clone() }))
        .build_with_pool(pool)
        .await
        .expect("Failed to build runtime");

    (runtime, seen)
}

pub fn admin(practice_id: Uuid) -> CallerScope {
    CallerScope::practice(Uuid::new_v4(), practice_id, Role::Admin)
}

pub fn customer(practice_id: Uuid) -> CallerScope {
    CallerScope::practice(Uuid::new_v4(), practice_id, Role::User)
}

pub fn superuser() -> CallerScope {
    CallerScope::superuser(Uuid::new_v4())
}

pub fn quote_input() -> NewQuoteInput {
    NewQuoteInput {
        service_type: "appointment-reminder".to_string(),
        recipient_count: 250,
        total_cost_cents: 18_750,
    }
}

pub fn order_input(policy: ApprovalPolicy) -> NewOrderInput {
    NewOrderInput {
        service_type: "recall-notice".to_string(),
        recipient_count: 120,
        total_cost_cents: 9_600,
        approval_policy: policy,
    }
}

/// Kinds of all collected events, in order.
pub fn event_kinds(seen: &Arc<Mutex<Vec<DomainEvent>>>) -> Vec<&'static str> {
    seen.lock().unwrap().iter().map(|e| e.kind()).collect()
}
