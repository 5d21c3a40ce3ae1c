//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building. Every business table carries `practice_id` directly or joins to
//! it through `orders`; `audit_log` is system-wide and carries no foreign
//! keys, so business-row deletion never cascades into the trail.

use sea_query::Iden;

/// Quotes table schema.
#[derive(Iden)]
pub enum Quotes {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "quote_number"]
    QuoteNumber,
    #[iden = "practice_id"]
    PracticeId,
    #[iden = "user_id"]
    UserId,
    #[iden = "status"]
    Status,
    #[iden = "service_type"]
    ServiceType,
    #[iden = "recipient_count"]
    RecipientCount,
    #[iden = "total_cost_cents"]
    TotalCostCents,
    #[iden = "converted_order_id"]
    ConvertedOrderId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Orders table schema.
#[derive(Iden)]
pub enum Orders {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "order_number"]
    OrderNumber,
    #[iden = "practice_id"]
    PracticeId,
    #[iden = "user_id"]
    UserId,
    #[iden = "quote_id"]
    QuoteId,
    #[iden = "status"]
    Status,
    #[iden = "approval_policy"]
    ApprovalPolicy,
    #[iden = "service_type"]
    ServiceType,
    #[iden = "recipient_count"]
    RecipientCount,
    #[iden = "total_cost_cents"]
    TotalCostCents,
    #[iden = "production_start_date"]
    ProductionStartDate,
    #[iden = "production_end_date"]
    ProductionEndDate,
    #[iden = "fulfilled_at"]
    FulfilledAt,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Proofs table schema.
#[derive(Iden)]
pub enum Proofs {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "order_id"]
    OrderId,
    #[iden = "proof_round"]
    ProofRound,
    #[iden = "status"]
    Status,
    #[iden = "file_ref"]
    FileRef,
    #[iden = "user_feedback"]
    UserFeedback,
    #[iden = "admin_notes"]
    AdminNotes,
    #[iden = "escalation_reason"]
    EscalationReason,
    #[iden = "responded_at"]
    RespondedAt,
    #[iden = "created_at"]
    CreatedAt,
}

/// Order approvals table schema (append-only).
#[derive(Iden)]
pub enum OrderApprovals {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "order_id"]
    OrderId,
    #[iden = "proof_id"]
    ProofId,
    #[iden = "decision"]
    Decision,
    #[iden = "comments"]
    Comments,
    #[iden = "decided_at"]
    DecidedAt,
}

/// Order status history table schema (append-only).
#[derive(Iden)]
pub enum OrderStatusHistory {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "order_id"]
    OrderId,
    #[iden = "from_status"]
    FromStatus,
    #[iden = "to_status"]
    ToStatus,
    #[iden = "changed_by"]
    ChangedBy,
    #[iden = "changed_by_role"]
    ChangedByRole,
    #[iden = "comments"]
    Comments,
    #[iden = "metadata"]
    Metadata,
    #[iden = "created_at"]
    CreatedAt,
}

/// Audit log table schema (append-only, system-wide).
#[derive(Iden)]
pub enum AuditLog {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "actor_id"]
    ActorId,
    #[iden = "actor_role"]
    ActorRole,
    #[iden = "practice_id"]
    PracticeId,
    #[iden = "action"]
    Action,
    #[iden = "resource"]
    Resource,
    #[iden = "resource_id"]
    ResourceId,
    #[iden = "severity"]
    Severity,
    #[iden = "contains_phi"]
    ContainsPhi,
    #[iden = "success"]
    Success,
    #[iden = "detail"]
    Detail,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "retain_until"]
    RetainUntil,
}

/// SQL for creating the quotes table.
pub const CREATE_QUOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quotes (
    id TEXT PRIMARY KEY,
    quote_number INTEGER NOT NULL UNIQUE,
    practice_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL,
    service_type TEXT NOT NULL,
    recipient_count INTEGER NOT NULL,
    total_cost_cents INTEGER NOT NULL,
    converted_order_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_quotes_practice ON quotes(practice_id);
"#;

/// SQL for creating the orders table.
pub const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    order_number INTEGER NOT NULL UNIQUE,
    practice_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    quote_id TEXT,
    status TEXT NOT NULL,
    approval_policy TEXT NOT NULL,
    service_type TEXT NOT NULL,
    recipient_count INTEGER NOT NULL,
    total_cost_cents INTEGER NOT NULL,
    production_start_date TEXT,
    production_end_date TEXT,
    fulfilled_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_practice ON orders(practice_id);
"#;

/// SQL for creating the proofs table.
pub const CREATE_PROOFS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proofs (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    proof_round INTEGER NOT NULL,
    status TEXT NOT NULL,
    file_ref TEXT NOT NULL,
    user_feedback TEXT,
    admin_notes TEXT,
    escalation_reason TEXT,
    responded_at TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (order_id, proof_round)
);

CREATE INDEX IF NOT EXISTS idx_proofs_order ON proofs(order_id);
"#;

/// SQL for creating the order approvals table.
pub const CREATE_ORDER_APPROVALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_approvals (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    proof_id TEXT NOT NULL UNIQUE,
    decision TEXT NOT NULL,
    comments TEXT,
    decided_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_order_approvals_order ON order_approvals(order_id);
"#;

/// SQL for creating the order status history table.
pub const CREATE_ORDER_STATUS_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_status_history (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    from_status TEXT,
    to_status TEXT NOT NULL,
    changed_by TEXT NOT NULL,
    changed_by_role TEXT NOT NULL,
    comments TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_order ON order_status_history(order_id);
"#;

/// SQL for creating the audit log table.
pub const CREATE_AUDIT_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    actor_id TEXT NOT NULL,
    actor_role TEXT NOT NULL,
    practice_id TEXT,
    action TEXT NOT NULL,
    resource TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    severity TEXT NOT NULL,
    contains_phi INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL DEFAULT 1,
    detail TEXT,
    created_at TEXT NOT NULL,
    retain_until TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_practice ON audit_log(practice_id);
CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_log(resource, resource_id);
CREATE INDEX IF NOT EXISTS idx_audit_retain ON audit_log(retain_until);
"#;

/// All DDL statements, in creation order.
pub const ALL_TABLES: &[&str] = &[
    CREATE_QUOTES_TABLE,
    CREATE_ORDERS_TABLE,
    CREATE_PROOFS_TABLE,
    CREATE_ORDER_APPROVALS_TABLE,
    CREATE_ORDER_STATUS_HISTORY_TABLE,
    CREATE_AUDIT_LOG_TABLE,
];
