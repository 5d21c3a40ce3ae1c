//! The never-throw audit recorder.
//!
//! Audit writes must not fail or block the business operation they mirror:
//! each append gets a bounded timeout and a short retry, and exhaustion
//! lands the record in the tracing fallback sink plus the operational alert
//! hook. The read side serves the compliance trail API.

use std::sync::Arc;

use backon::Retryable;
use tracing::{debug, warn};

use crate::config::{AuditConfig, TimeoutConfig};
use crate::interfaces::{
    AlertHook, AuditStore, CoreResult, StorageError, StorageResult,
};
use crate::model::{AuditFilter, AuditRecord, CallerScope};
use crate::utils::retry::audit_backoff;

use super::with_timeout;

/// Recorder for the system-wide compliance log.
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    alert: Arc<dyn AlertHook>,
    config: AuditConfig,
    timeouts: TimeoutConfig,
}

impl AuditRecorder {
    /// Create a recorder over a store and an alert hook.
    pub fn new(
        store: Arc<dyn AuditStore>,
        alert: Arc<dyn AlertHook>,
        config: AuditConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            store,
            alert,
            config,
            timeouts,
        }
    }

    /// Append one audit row. Never fails the caller.
    ///
    /// Failures are retried with backoff; a write that still cannot land is
    /// logged in full as the fallback sink and escalated through the alert
    /// hook, so total silent loss cannot happen quietly.
    pub async fn record(&self, record: AuditRecord) {
        let attempt = || {
            let store = self.store.clone();
            let record = record.clone();
            let budget = self.timeouts.audit();
            async move {
                match tokio::time::timeout(budget, store.append(record)).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::Timeout),
                }
            }
        };

        match attempt.retry(audit_backoff(&self.config)).await {
            Ok(()) => {
                debug!(
                    audit.id = %record.id,
                    audit.action = record.action.as_str(),
                    audit.resource = record.resource.as_str(),
                    "Audit row appended"
                );
            }
            Err(err) => {
                // Fallback sink: the full record lands in the log stream so
                // an operator can reconstruct the row.
                warn!(
                    audit.id = %record.id,
                    audit.action = record.action.as_str(),
                    audit.resource = record.resource.as_str(),
                    audit.resource_id = %record.resource_id,
                    audit.actor = %record.actor_id,
                    audit.success = record.success,
                    audit.detail = record.detail.as_deref().unwrap_or(""),
                    error = %err,
                    "Audit append failed after retries; record preserved in log only"
                );
                self.alert.audit_write_lost(&record, &err.to_string()).await;
            }
        }
    }

    /// Query the audit trail on behalf of compliance/support tooling.
    /// Non-superusers see only their own practice's rows.
    pub async fn query(
        &self,
        scope: &CallerScope,
        filter: AuditFilter,
    ) -> CoreResult<Vec<AuditRecord>> {
        with_timeout(self.timeouts.storage(), self.store.query(scope, filter)).await
    }

    /// Direct store access for the external purge job.
    pub fn store(&self) -> Arc<dyn AuditStore> {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use crate::model::{AuditAction, AuditResource, AuditSeverity};

    struct FlakyStore {
        fail_first: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AuditStore for FlakyStore {
        async fn append(&self, _record: AuditRecord) -> StorageResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                Err(StorageError::Timeout)
            } else {
                Ok(())
            }
        }

        async fn query(
            &self,
            _scope: &CallerScope,
            _filter: AuditFilter,
        ) -> StorageResult<Vec<AuditRecord>> {
            Ok(Vec::new())
        }

        async fn purge_expired(&self, _now: DateTime<Utc>) -> StorageResult<u64> {
            Ok(0)
        }
    }

    struct CountingAlert {
        fired: AtomicUsize,
    }

    #[async_trait]
    impl AlertHook for CountingAlert {
        async fn audit_write_lost(&self, _record: &AuditRecord, _reason: &str) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_record() -> AuditRecord {
        let scope = CallerScope::superuser(Uuid::new_v4());
        AuditRecord::new(
            &scope,
            AuditAction::Update,
            AuditResource::Order,
            Uuid::new_v4(),
            AuditSeverity::Info,
            true,
            None,
        )
    }

    fn recorder(store: Arc<FlakyStore>, alert: Arc<CountingAlert>) -> AuditRecorder {
        AuditRecorder::new(
            store,
            alert,
            AuditConfig {
                retry_attempts: 3,
                retry_min_delay_ms: 1,
                retry_max_delay_ms: 2,
            },
            TimeoutConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_retries_until_append_lands() {
        let store = Arc::new(FlakyStore {
            fail_first: 2,
            attempts: AtomicUsize::new(0),
        });
        let alert = Arc::new(CountingAlert {
            fired: AtomicUsize::new(0),
        });

        recorder(store.clone(), alert.clone())
            .record(sample_record())
            .await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(alert.fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fire_alert_without_failing() {
        let store = Arc::new(FlakyStore {
            fail_first: usize::MAX,
            attempts: AtomicUsize::new(0),
        });
        let alert = Arc::new(CountingAlert {
            fired: AtomicUsize::new(0),
        });

        // Returns normally despite every append failing.
        recorder(store, alert.clone()).record(sample_record()).await;

        assert_eq!(alert.fired.load(Ordering::SeqCst), 1);
    }
}
