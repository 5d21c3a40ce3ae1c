//! Audit log persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{AuditFilter, AuditRecord, CallerScope};

use super::StorageResult;

/// Interface for the system-wide append-only audit log.
///
/// Rows carry no foreign keys; deleting a business record never touches its
/// audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one audit row.
    async fn append(&self, record: AuditRecord) -> StorageResult<()>;

    /// Query the trail. Non-superuser scopes see only rows stamped with
    /// their practice.
    async fn query(
        &self,
        scope: &CallerScope,
        filter: AuditFilter,
    ) -> StorageResult<Vec<AuditRecord>>;

    /// Delete rows whose retention window has fully elapsed, returning the
    /// count removed. Rows with `retain_until >= now` are never touched.
    ///
    /// Called by an external scheduled job, never by the lifecycle core.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}
