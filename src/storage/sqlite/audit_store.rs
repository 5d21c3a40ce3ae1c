//! SQLite audit log store.
//!
//! Append-only; the only delete path is `purge_expired`, which refuses rows
//! still inside their retention window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::interfaces::{AuditStore, StorageResult};
use crate::model::{
    AuditAction, AuditFilter, AuditRecord, AuditResource, AuditSeverity, CallerScope, Role,
};
use crate::storage::schema::AuditLog;

use super::{parse_opt_uuid, parse_timestamp, parse_uuid, scope_practice};

/// SQLite implementation of AuditStore.
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const AUDIT_COLUMNS: [AuditLog; 13] = [
    AuditLog::Id,
    AuditLog::ActorId,
    AuditLog::ActorRole,
    AuditLog::PracticeId,
    AuditLog::Action,
    AuditLog::Resource,
    AuditLog::ResourceId,
    AuditLog::Severity,
    AuditLog::ContainsPhi,
    AuditLog::Success,
    AuditLog::Detail,
    AuditLog::CreatedAt,
    AuditLog::RetainUntil,
];

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StorageResult<AuditRecord> {
    let id: String = row.get("id");
    let actor_id: String = row.get("actor_id");
    let actor_role: String = row.get("actor_role");
    let practice_id: Option<String> = row.get("practice_id");
    let action: String = row.get("action");
    let resource: String = row.get("resource");
    let resource_id: String = row.get("resource_id");
    let severity: String = row.get("severity");
    let contains_phi: i64 = row.get("contains_phi");
    let success: i64 = row.get("success");
    let created_at: String = row.get("created_at");
    let retain_until: String = row.get("retain_until");

    Ok(AuditRecord {
        id: parse_uuid(&id)?,
        actor_id: parse_uuid(&actor_id)?,
        actor_role: Role::parse(&actor_role)?,
        practice_id: parse_opt_uuid(practice_id)?,
        action: AuditAction::parse(&action)?,
        resource: AuditResource::parse(&resource)?,
        resource_id: parse_uuid(&resource_id)?,
        severity: AuditSeverity::parse(&severity)?,
        contains_phi: contains_phi != 0,
        success: success != 0,
        detail: row.get("detail"),
        created_at: parse_timestamp(&created_at)?,
        retain_until: parse_timestamp(&retain_until)?,
    })
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, record: AuditRecord) -> StorageResult<()> {
        let query = Query::insert()
            .into_table(AuditLog::Table)
            .columns(AUDIT_COLUMNS)
            .values_panic([
                record.id.to_string().into(),
                record.actor_id.to_string().into(),
                record.actor_role.as_str().into(),
                record.practice_id.map(|p| p.to_string()).into(),
                record.action.as_str().into(),
                record.resource.as_str().into(),
                record.resource_id.to_string().into(),
                record.severity.as_str().into(),
                i64::from(record.contains_phi).into(),
                i64::from(record.success).into(),
                record.detail.clone().into(),
                record.created_at.to_rfc3339().into(),
                record.retain_until.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn query(
        &self,
        scope: &CallerScope,
        filter: AuditFilter,
    ) -> StorageResult<Vec<AuditRecord>> {
        let mut query = Query::select();
        query
            .columns(AUDIT_COLUMNS)
            .from(AuditLog::Table)
            .order_by(AuditLog::CreatedAt, SortOrder::Asc);

        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col(AuditLog::PracticeId).eq(practice));
        }
        if let Some(resource) = filter.resource {
            query.and_where(Expr::col(AuditLog::Resource).eq(resource.as_str()));
        }
        if let Some(resource_id) = filter.resource_id {
            query.and_where(Expr::col(AuditLog::ResourceId).eq(resource_id.to_string()));
        }
        if let Some(actor_id) = filter.actor_id {
            query.and_where(Expr::col(AuditLog::ActorId).eq(actor_id.to_string()));
        }
        if let Some(action) = filter.action {
            query.and_where(Expr::col(AuditLog::Action).eq(action.as_str()));
        }
        if let Some(since) = filter.since {
            query.and_where(Expr::col(AuditLog::CreatedAt).gte(since.to_rfc3339()));
        }
        if let Some(until) = filter.until {
            query.and_where(Expr::col(AuditLog::CreatedAt).lt(until.to_rfc3339()));
        }

        let query = query.to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        // RFC3339 ordering matches chronological ordering for UTC stamps.
        let query = Query::delete()
            .from_table(AuditLog::Table)
            .and_where(Expr::col(AuditLog::RetainUntil).lt(now.to_rfc3339()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
