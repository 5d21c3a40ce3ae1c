//! SQLite read side of the order status timeline.

use async_trait::async_trait;
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{HistoryStore, StorageResult};
use crate::model::{CallerScope, OrderStatus, Role, StatusChange};
use crate::storage::schema::{OrderStatusHistory, Orders};

use super::{parse_opt_json, parse_timestamp, parse_uuid, scope_practice};

/// SQLite implementation of HistoryStore.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new SQLite history store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_change(row: &sqlx::sqlite::SqliteRow) -> StorageResult<StatusChange> {
    let id: String = row.get("id");
    let order_id: String = row.get("order_id");
    let from_status: Option<String> = row.get("from_status");
    let to_status: String = row.get("to_status");
    let changed_by: String = row.get("changed_by");
    let changed_by_role: String = row.get("changed_by_role");
    let created_at: String = row.get("created_at");

    Ok(StatusChange {
        id: parse_uuid(&id)?,
        order_id: parse_uuid(&order_id)?,
        from_status: from_status
            .as_deref()
            .map(OrderStatus::parse)
            .transpose()?,
        to_status: OrderStatus::parse(&to_status)?,
        changed_by: parse_uuid(&changed_by)?,
        changed_by_role: Role::parse(&changed_by_role)?,
        comments: row.get("comments"),
        metadata: parse_opt_json(row, "metadata"),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn list_for_order(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> StorageResult<Vec<StatusChange>> {
        let mut query = Query::select();
        query
            .columns([
                (OrderStatusHistory::Table, OrderStatusHistory::Id),
                (OrderStatusHistory::Table, OrderStatusHistory::OrderId),
                (OrderStatusHistory::Table, OrderStatusHistory::FromStatus),
                (OrderStatusHistory::Table, OrderStatusHistory::ToStatus),
                (OrderStatusHistory::Table, OrderStatusHistory::ChangedBy),
                (OrderStatusHistory::Table, OrderStatusHistory::ChangedByRole),
                (OrderStatusHistory::Table, OrderStatusHistory::Comments),
                (OrderStatusHistory::Table, OrderStatusHistory::Metadata),
                (OrderStatusHistory::Table, OrderStatusHistory::CreatedAt),
            ])
            .from(OrderStatusHistory::Table)
            .inner_join(
                Orders::Table,
                Expr::col((OrderStatusHistory::Table, OrderStatusHistory::OrderId))
                    .equals((Orders::Table, Orders::Id)),
            )
            .and_where(
                Expr::col((OrderStatusHistory::Table, OrderStatusHistory::OrderId))
                    .eq(order_id.to_string()),
            )
            .order_by(
                (OrderStatusHistory::Table, OrderStatusHistory::CreatedAt),
                SortOrder::Asc,
            );
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col((Orders::Table, Orders::PracticeId)).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_change).collect()
    }
}
