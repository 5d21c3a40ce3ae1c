//! SQLite proof store: revision rounds and the atomic decision+approval
//! write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Acquire, Row, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{ProofStore, StorageError, StorageResult};
use crate::model::{
    CallerScope, NewApproval, OrderApproval, Proof, ProofDecision, ProofStatus,
};
use crate::storage::schema::{OrderApprovals, Orders, Proofs};

use super::{parse_opt_timestamp, parse_timestamp, parse_uuid, scope_practice};

/// SQLite implementation of ProofStore.
pub struct SqliteProofStore {
    pool: SqlitePool,
}

impl SqliteProofStore {
    /// Create a new SQLite proof store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const PROOF_COLUMNS: [Proofs; 10] = [
    Proofs::Id,
    Proofs::OrderId,
    Proofs::ProofRound,
    Proofs::Status,
    Proofs::FileRef,
    Proofs::UserFeedback,
    Proofs::AdminNotes,
    Proofs::EscalationReason,
    Proofs::RespondedAt,
    Proofs::CreatedAt,
];

fn row_to_proof(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Proof> {
    let id: String = row.get("id");
    let order_id: String = row.get("order_id");
    let status: String = row.get("status");
    let responded_at: Option<String> = row.get("responded_at");
    let created_at: String = row.get("created_at");

    Ok(Proof {
        id: parse_uuid(&id)?,
        order_id: parse_uuid(&order_id)?,
        proof_round: row.get("proof_round"),
        status: ProofStatus::parse(&status)?,
        file_ref: row.get("file_ref"),
        user_feedback: row.get("user_feedback"),
        admin_notes: row.get("admin_notes"),
        escalation_reason: row.get("escalation_reason"),
        responded_at: parse_opt_timestamp(responded_at)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> StorageResult<OrderApproval> {
    let id: String = row.get("id");
    let order_id: String = row.get("order_id");
    let proof_id: String = row.get("proof_id");
    let decision: String = row.get("decision");
    let decided_at: String = row.get("decided_at");

    Ok(OrderApproval {
        id: parse_uuid(&id)?,
        order_id: parse_uuid(&order_id)?,
        proof_id: parse_uuid(&proof_id)?,
        decision: ProofDecision::parse(&decision)?,
        comments: row.get("comments"),
        decided_at: parse_timestamp(&decided_at)?,
    })
}

/// Select proof columns qualified through the orders join, so practice
/// scoping can apply to rows that carry no practice column themselves.
fn scoped_proof_select(scope: &CallerScope) -> sea_query::SelectStatement {
    let mut query = Query::select();
    query
        .columns(PROOF_COLUMNS.map(|col| (Proofs::Table, col)))
        .from(Proofs::Table)
        .inner_join(
            Orders::Table,
            Expr::col((Proofs::Table, Proofs::OrderId)).equals((Orders::Table, Orders::Id)),
        );
    if let Some(practice) = scope_practice(scope) {
        query.and_where(Expr::col((Orders::Table, Orders::PracticeId)).eq(practice));
    }
    query
}

#[async_trait]
impl ProofStore for SqliteProofStore {
    async fn create_round(
        &self,
        order_id: Uuid,
        proof_round: i64,
        status: ProofStatus,
        file_ref: String,
        admin_notes: Option<String>,
        escalation_reason: Option<String>,
    ) -> StorageResult<Proof> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let query = Query::insert()
            .into_table(Proofs::Table)
            .columns(PROOF_COLUMNS)
            .values_panic([
                id.to_string().into(),
                order_id.to_string().into(),
                proof_round.into(),
                status.as_str().into(),
                file_ref.clone().into(),
                Option::<String>::None.into(),
                admin_notes.clone().into(),
                escalation_reason.clone().into(),
                Option::<String>::None.into(),
                now.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(Proof {
            id,
            order_id,
            proof_round,
            status,
            file_ref,
            user_feedback: None,
            admin_notes,
            escalation_reason,
            responded_at: None,
            created_at: now,
        })
    }

    async fn get(&self, scope: &CallerScope, id: Uuid) -> StorageResult<Proof> {
        let mut query = scoped_proof_select(scope);
        query.and_where(Expr::col((Proofs::Table, Proofs::Id)).eq(id.to_string()));
        let query = query.to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_proof(&row),
            None => Err(StorageError::NotFound {
                resource: "proof",
                id,
            }),
        }
    }

    async fn latest_for_order(&self, order_id: Uuid) -> StorageResult<Option<Proof>> {
        let query = Query::select()
            .columns(PROOF_COLUMNS)
            .from(Proofs::Table)
            .and_where(Expr::col(Proofs::OrderId).eq(order_id.to_string()))
            .order_by(Proofs::ProofRound, SortOrder::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_proof).transpose()
    }

    async fn list_for_order(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> StorageResult<Vec<Proof>> {
        let mut query = scoped_proof_select(scope);
        query
            .and_where(Expr::col((Proofs::Table, Proofs::OrderId)).eq(order_id.to_string()))
            .order_by((Proofs::Table, Proofs::ProofRound), SortOrder::Asc);
        let query = query.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_proof).collect()
    }

    async fn record_decision(
        &self,
        proof_id: Uuid,
        status: ProofStatus,
        user_feedback: Option<String>,
        responded_at: DateTime<Utc>,
        approval: NewApproval,
    ) -> StorageResult<(Proof, OrderApproval)> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // Optimistic guard: only a PENDING proof can be decided. Zero rows
        // means a concurrent decision won or the round was never pending.
        let query = Query::update()
            .table(Proofs::Table)
            .value(Proofs::Status, status.as_str())
            .value(Proofs::UserFeedback, user_feedback)
            .value(Proofs::RespondedAt, responded_at.to_rfc3339())
            .and_where(Expr::col(Proofs::Id).eq(proof_id.to_string()))
            .and_where(Expr::col(Proofs::Status).eq(ProofStatus::Pending.as_str()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::StaleStatus {
                resource: "proof",
                id: proof_id,
                expected: ProofStatus::Pending.as_str(),
            });
        }

        let approval_row = OrderApproval {
            id: Uuid::new_v4(),
            order_id: approval.order_id,
            proof_id,
            decision: approval.decision,
            comments: approval.comments,
            decided_at: responded_at,
        };

        let query = Query::insert()
            .into_table(OrderApprovals::Table)
            .columns([
                OrderApprovals::Id,
                OrderApprovals::OrderId,
                OrderApprovals::ProofId,
                OrderApprovals::Decision,
                OrderApprovals::Comments,
                OrderApprovals::DecidedAt,
            ])
            .values_panic([
                approval_row.id.to_string().into(),
                approval_row.order_id.to_string().into(),
                proof_id.to_string().into(),
                approval_row.decision.as_str().into(),
                approval_row.comments.clone().into(),
                approval_row.decided_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *tx).await?;
        tx.commit().await?;
        // Release the pooled connection before re-reading through the pool;
        // a single-connection pool would otherwise wait on itself.
        drop(conn);

        let query = Query::select()
            .columns(PROOF_COLUMNS)
            .from(Proofs::Table)
            .and_where(Expr::col(Proofs::Id).eq(proof_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        let proof = match row {
            Some(row) => row_to_proof(&row)?,
            None => {
                return Err(StorageError::NotFound {
                    resource: "proof",
                    id: proof_id,
                })
            }
        };

        Ok((proof, approval_row))
    }

    async fn approvals_for_order(
        &self,
        scope: &CallerScope,
        order_id: Uuid,
    ) -> StorageResult<Vec<OrderApproval>> {
        let mut query = Query::select();
        query
            .columns([
                (OrderApprovals::Table, OrderApprovals::Id),
                (OrderApprovals::Table, OrderApprovals::OrderId),
                (OrderApprovals::Table, OrderApprovals::ProofId),
                (OrderApprovals::Table, OrderApprovals::Decision),
                (OrderApprovals::Table, OrderApprovals::Comments),
                (OrderApprovals::Table, OrderApprovals::DecidedAt),
            ])
            .from(OrderApprovals::Table)
            .inner_join(
                Orders::Table,
                Expr::col((OrderApprovals::Table, OrderApprovals::OrderId))
                    .equals((Orders::Table, Orders::Id)),
            )
            .and_where(
                Expr::col((OrderApprovals::Table, OrderApprovals::OrderId))
                    .eq(order_id.to_string()),
            )
            .order_by(
                (OrderApprovals::Table, OrderApprovals::DecidedAt),
                SortOrder::Asc,
            );
        if let Some(practice) = scope_practice(scope) {
            query.and_where(Expr::col((Orders::Table, Orders::PracticeId)).eq(practice));
        }
        let query = query.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_approval).collect()
    }
}
