//! SQLite implementations of the storage interfaces.
//!
//! All stores share one pool; multi-row operations run inside a single
//! transaction with an optimistic guard on the mutated status column.
//! Uuids and timestamps are stored as text (RFC3339 for instants).

mod audit_store;
mod history_store;
mod order_store;
mod proof_store;
mod quote_store;

pub use audit_store::SqliteAuditStore;
pub use history_store::SqliteHistoryStore;
pub use order_store::SqliteOrderStore;
pub use proof_store::SqliteProofStore;
pub use quote_store::SqliteQuoteStore;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{StorageError, StorageResult};
use crate::model::CallerScope;
use crate::storage::schema::ALL_TABLES;

/// Create every table the core persists. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> StorageResult<()> {
    for ddl in ALL_TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// The practice filter a scope imposes on queries, if any.
///
/// Superusers see everything; every other scope is pinned to its practice.
pub(crate) fn scope_practice(scope: &CallerScope) -> Option<String> {
    if scope.is_superuser() {
        None
    } else {
        // A non-superuser scope always carries a practice; a missing one
        // matches no rows rather than all of them.
        Some(
            scope
                .practice_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        )
    }
}

pub(crate) fn parse_uuid(value: &str) -> StorageResult<Uuid> {
    Ok(Uuid::parse_str(value)?)
}

pub(crate) fn parse_opt_uuid(value: Option<String>) -> StorageResult<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp {
            value: value.to_string(),
        })
}

pub(crate) fn parse_opt_timestamp(value: Option<String>) -> StorageResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn parse_opt_date(value: Option<String>) -> StorageResult<Option<NaiveDate>> {
    value
        .as_deref()
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| StorageError::InvalidTimestamp {
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Read an optional JSON column.
pub(crate) fn parse_opt_json(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Option<serde_json::Value> {
    let raw: Option<String> = row.get(column);
    raw.and_then(|text| serde_json::from_str(&text).ok())
}
