//! SQLite quote store, including the one-way conversion transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Acquire, Row, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{QuoteStore, StorageError, StorageResult};
use crate::model::{
    CallerScope, NewOrder, NewQuote, Order, OrderStatus, Quote, QuoteStatus, StatusChangeInput,
};
use crate::storage::schema::Quotes;

use super::order_store::{insert_history, insert_order};
use super::{parse_opt_uuid, parse_timestamp, parse_uuid, scope_practice};

/// SQLite implementation of QuoteStore.
pub struct SqliteQuoteStore {
    pool: SqlitePool,
}

impl SqliteQuoteStore {
    /// Create a new SQLite quote store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const QUOTE_COLUMNS: [Quotes; 11] = [
    Quotes::Id,
    Quotes::QuoteNumber,
    Quotes::PracticeId,
    Quotes::UserId,
    Quotes::Status,
    Quotes::ServiceType,
    Quotes::RecipientCount,
    Quotes::TotalCostCents,
    Quotes::ConvertedOrderId,
    Quotes::CreatedAt,
    Quotes::UpdatedAt,
];

fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Quote> {
    let id: String = row.get("id");
    let practice_id: String = row.get("practice_id");
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    let converted_order_id: Option<String> = row.get("converted_order_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Quote {
        id: parse_uuid(&id)?,
        quote_number: row.get("quote_number"),
        practice_id: parse_uuid(&practice_id)?,
        user_id: parse_uuid(&user_id)?,
        status: QuoteStatus::parse(&status)?,
        service_type: row.get("service_type"),
        recipient_count: row.get("recipient_count"),
        total_cost_cents: row.get("total_cost_cents"),
        converted_order_id: parse_opt_uuid(converted_order_id)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl QuoteStore for SqliteQuoteStore {
    async fn create(&self, quote: NewQuote) -> StorageResult<Quote> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // Next sequential number, isolated by the transaction.
        let query = Query::select()
            .expr(Expr::col(Quotes::QuoteNumber).max())
            .from(Quotes::Table)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *tx).await?;
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
            .into_table(Quotes::Table)
            .columns(QUOTE_COLUMNS)
            .values_panic([
                id.to_string().into(),
                next_number.into(),
                quote.practice_id.to_string().into(),
                quote.user_id.to_string().into(),
                QuoteStatus::Pending.as_str().into(),
                quote.service_type.clone().into(),
                quote.recipient_count.into(),
                quote.total_cost_cents.into(),
                Option::<String>::None.into(),
                now.to_rfc3339().into(),
                now.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(Quote {
            id,
            quote_number: next_number,
            practice_id: quote.practice_id,
            user_id: quote.user_id,
            status: QuoteStatus::Pending,
            service_type: quote.service_type,
            recipient_count: quote.recipient_count,
            total_cost_cents: quote.total_cost_cents,
            converted_order_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Quote> {
        let mut query = Query::select();
        query
            .columns(QUOTE_COLUMNS)
            .from(Quotes::Table)
            .and_where(Expr::col(Quotes::Id).eq(id.to_string()));
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col(Quotes::PracticeId).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_quote(&row),
            None => Err(StorageError::NotFound {
                resource: "quote",
                id,
            }),
        }
    }

    async fn list(&self, scope: &CallerScope) -> StorageResult<Vec<Quote>> {
        let mut query = Query::select();
        query
            .columns(QUOTE_COLUMNS)
            .from(Quotes::Table)
            .order_by(Quotes::QuoteNumber, SortOrder::Desc);
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col(Quotes::PracticeId).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_quote).collect()
    }

    async fn archive(&self, id: Uuid) -> StorageResult<Quote> {
        let now = Utc::now();

        let query = Query::update()
            .table(Quotes::Table)
            .value(Quotes::Status, QuoteStatus::Archived.as_str())
            .value(Quotes::UpdatedAt, now.to_rfc3339())
            .and_where(Expr::col(Quotes::Id).eq(id.to_string()))
            .and_where(Expr::col(Quotes::Status).eq(QuoteStatus::Pending.as_str()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::StaleStatus {
                resource: "quote",
                id,
                expected: QuoteStatus::Pending.as_str(),
            });
        }

        self.get(&CallerScope::superuser(Uuid::nil()), id).await
    }

    async fn convert(
        &self,
        quote_id: Uuid,
        order: NewOrder,
        change: StatusChangeInput,
    ) -> StorageResult<(Quote, Order)> {
        let now = Utc::now();

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let created = insert_order(&mut tx, &order).await?;
        insert_history(
            &mut tx,
            created.id,
            None,
            OrderStatus::Draft,
            change.changed_by,
            change.changed_by_role,
            change.comments,
            change.metadata,
        )
        .await?;

        // Flip the quote, guarded on it still being pending. Zero rows means
        // a concurrent conversion (or archive) won; roll back the order too.
        let query = Query::update()
            .table(Quotes::Table)
            .value(Quotes::Status, QuoteStatus::Converted.as_str())
            .value(Quotes::ConvertedOrderId, created.id.to_string())
            .value(Quotes::UpdatedAt, now.to_rfc3339())
            .and_where(Expr::col(Quotes::Id).eq(quote_id.to_string()))
            .and_where(Expr::col(Quotes::Status).eq(QuoteStatus::Pending.as_str()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::StaleStatus {
                resource: "quote",
                id: quote_id,
                expected: QuoteStatus::Pending.as_str(),
            });
        }

        tx.commit().await?;
        // Release the pooled connection before re-reading through the pool;
        // a single-connection pool would otherwise wait on itself.
        drop(conn);

        let quote = self
            .get(&CallerScope::superuser(Uuid::nil()), quote_id)
            .await?;
        Ok((quote, created))
    }
}
