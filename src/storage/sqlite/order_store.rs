//! SQLite order store: sequential numbering and the atomic
//! transition+history write.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Acquire, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{OrderStore, StorageError, StorageResult};
use crate::model::{
    ApprovalPolicy, CallerScope, NewOrder, Order, OrderStatus, Role, StatusChangeInput,
};
use crate::storage::schema::{OrderStatusHistory, Orders};

use super::{parse_opt_date, parse_opt_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid,
    scope_practice};

/// SQLite implementation of OrderStore.
pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Create a new SQLite order store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: [Orders; 15] = [
    Orders::Id,
    Orders::OrderNumber,
    Orders::PracticeId,
    Orders::UserId,
    Orders::QuoteId,
    Orders::Status,
    Orders::ApprovalPolicy,
    Orders::ServiceType,
    Orders::RecipientCount,
    Orders::TotalCostCents,
    Orders::ProductionStartDate,
    Orders::ProductionEndDate,
    Orders::FulfilledAt,
    Orders::CreatedAt,
    Orders::UpdatedAt,
];

pub(crate) fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Order> {
    let id: String = row.get("id");
    let practice_id: String = row.get("practice_id");
    let user_id: String = row.get("user_id");
    let quote_id: Option<String> = row.get("quote_id");
    let status: String = row.get("status");
    let approval_policy: String = row.get("approval_policy");
    let production_start: Option<String> = row.get("production_start_date");
    let production_end: Option<String> = row.get("production_end_date");
    let fulfilled_at: Option<String> = row.get("fulfilled_at");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Order {
        id: parse_uuid(&id)?,
        order_number: row.get("order_number"),
        practice_id: parse_uuid(&practice_id)?,
        user_id: parse_uuid(&user_id)?,
        quote_id: parse_opt_uuid(quote_id)?,
        status: OrderStatus::parse(&status)?,
        approval_policy: ApprovalPolicy::parse(&approval_policy)?,
        service_type: row.get("service_type"),
        recipient_count: row.get("recipient_count"),
        total_cost_cents: row.get("total_cost_cents"),
        production_start_date: parse_opt_date(production_start)?,
        production_end_date: parse_opt_date(production_end)?,
        fulfilled_at: parse_opt_timestamp(fulfilled_at)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert an order inside an open transaction, assigning the next
/// sequential order number. Shared with the quote conversion path.
pub(crate) async fn insert_order(
    conn: &mut SqliteConnection,
    order: &NewOrder,
) -> StorageResult<Order> {
    let query = Query::select()
        .expr(Expr::col(Orders::OrderNumber).max())
        .from(Orders::Table)
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
    let next_number = match row {
        Some(row) => {
            let max: Option<i64> = row.get(0);
            max.unwrap_or(0) + 1
        }
        None => 1,
    };

    let id = Uuid::new_v4();
    let now = Utc::now();

    let query = Query::insert()
        .into_table(Orders::Table)
        .columns(ORDER_COLUMNS)
        .values_panic([
            id.to_string().into(),
            next_number.into(),
            order.practice_id.to_string().into(),
            order.user_id.to_string().into(),
            order.quote_id.map(|q| q.to_string()).into(),
            OrderStatus::Draft.as_str().into(),
            order.approval_policy.as_str().into(),
            order.service_type.clone().into(),
            order.recipient_count.into(),
            order.total_cost_cents.into(),
            Option::<String>::None.into(),
            Option::<String>::None.into(),
            Option::<String>::None.into(),
            now.to_rfc3339().into(),
            now.to_rfc3339().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;

    Ok(Order {
        id,
        order_number: next_number,
        practice_id: order.practice_id,
        user_id: order.user_id,
        quote_id: order.quote_id,
        status: OrderStatus::Draft,
        approval_policy: order.approval_policy,
        service_type: order.service_type.clone(),
        recipient_count: order.recipient_count,
        total_cost_cents: order.total_cost_cents,
        production_start_date: None,
        production_end_date: None,
        fulfilled_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Append a history row inside an open transaction.
pub(crate) async fn insert_history(
    conn: &mut SqliteConnection,
    order_id: Uuid,
    from: Option<OrderStatus>,
    to: OrderStatus,
    changed_by: Uuid,
    changed_by_role: Role,
    comments: Option<String>,
    metadata: Option<serde_json::Value>,
) -> StorageResult<()> {
    let query = Query::insert()
        .into_table(OrderStatusHistory::Table)
        .columns([
            OrderStatusHistory::Id,
            OrderStatusHistory::OrderId,
            OrderStatusHistory::FromStatus,
            OrderStatusHistory::ToStatus,
            OrderStatusHistory::ChangedBy,
            OrderStatusHistory::ChangedByRole,
            OrderStatusHistory::Comments,
            OrderStatusHistory::Metadata,
            OrderStatusHistory::CreatedAt,
        ])
        .values_panic([
            Uuid::new_v4().to_string().into(),
            order_id.to_string().into(),
            from.map(|s| s.as_str().to_string()).into(),
            to.as_str().into(),
            changed_by.to_string().into(),
            changed_by_role.as_str().into(),
            comments.into(),
            metadata.map(|m| m.to_string()).into(),
            Utc::now().to_rfc3339().into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn create(&self, order: NewOrder, change: StatusChangeInput) -> StorageResult<Order> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let created = insert_order(&mut tx, &order).await?;
        insert_history(
            &mut *tx,
            created.id,
            None,
            OrderStatus::Draft,
            change.changed_by,
            change.changed_by_role,
            change.comments,
            change.metadata,
        )
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Order> {
        let mut query = Query::select();
        query
            .columns(ORDER_COLUMNS)
            .from(Orders::Table)
            .and_where(Expr::col(Orders::Id).eq(id.to_string()));
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col(Orders::PracticeId).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_order(&row),
            None => Err(StorageError::NotFound {
                resource: "order",
                id,
            }),
        }
    }

    async fn list(&self, scope: &CallerScope) -> StorageResult<Vec<Order>> {
        let mut query = Query::select();
        query
            .columns(ORDER_COLUMNS)
            .from(Orders::Table)
            .order_by(Orders::OrderNumber, SortOrder::Desc);
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col(Orders::PracticeId).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_order).collect()
    }

    async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        change: StatusChangeInput,
    ) -> StorageResult<Order> {
        let now = Utc::now();

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut update = Query::update();
        update
            .table(Orders::Table)
            .value(Orders::Status, to.as_str())
            .value(Orders::UpdatedAt, now.to_rfc3339())
            .and_where(Expr::col(Orders::Id).eq(order_id.to_string()))
            .and_where(Expr::col(Orders::Status).eq(from.as_str()));

        // Status side effects recorded on the row itself.
        match to {
            OrderStatus::InProduction => {
                update.value(
                    Orders::ProductionStartDate,
                    now.date_naive().format("%Y-%m-%d").to_string(),
                );
            }
            OrderStatus::Completed => {
                update
                    .value(
                        Orders::ProductionEndDate,
                        now.date_naive().format("%Y-%m-%d").to_string(),
                    )
                    .value(Orders::FulfilledAt, now.to_rfc3339());
            }
            _ => {}
        }

        let query = update.to_string(SqliteQueryBuilder);
        let result = sqlx::query(&query).execute(&mut *tx).await?;

        // Zero rows means the status moved under us (or the id is gone);
        // roll everything back and let the caller re-read.
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::StaleStatus {
                resource: "order",
                id: order_id,
                expected: from.as_str(),
            });
        }

        insert_history(
            &mut tx,
            order_id,
            Some(from),
            to,
            change.changed_by,
            change.changed_by_role,
            change.comments,
            change.metadata,
        )
        .await?;

        tx.commit().await?;
        // Release the pooled connection before re-reading through the pool;
        // a single-connection pool would otherwise wait on itself.
        drop(conn);

        // Re-read outside the transaction for the committed row.
        let query = Query::select()
            .columns(ORDER_COLUMNS)
            .from(Orders::Table)
            .and_where(Expr::col(Orders::Id).eq(order_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_order(&row),
            None => Err(StorageError::NotFound {
                resource: "order",
                id: order_id,
            }),
        }
    }
}
