//! Audit trail and retention integration tests.

mod common;

use chrono::{Days, Duration, Months, Utc};
use uuid::Uuid;

use carepost::model::{
    ApprovalPolicy, AuditAction, AuditFilter, AuditResource, AuditSeverity, OrderStatus,
    ProofDecision,
};

use common::{admin, customer, order_input, quote_input, runtime, superuser};

#[tokio::test]
async fn test_every_mutation_leaves_an_audit_row() {
    let (rt, _) = runtime().await;
    let practice = Uuid::new_v4();
    let scope = admin(practice);

    let quote = rt.quotes.create_quote(&scope, quote_input()).await.unwrap();
    let (_, order) = rt.quotes.convert(&scope, quote.id).await.unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();

    let rows = rt.audit.query(&scope, AuditFilter::default()).await.unwrap();
    let actions: Vec<AuditAction> = rows.iter().map(|r| r.action).collect();
    assert!(actions.contains(&AuditAction::Create));
    assert!(actions.contains(&AuditAction::Convert));
    assert!(actions.contains(&AuditAction::Update));
}

#[tokio::test]
async fn test_rejected_transition_is_still_audited() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Completed, None)
        .await
        .unwrap_err();

    let rows = rt
        .audit
        .query(
            &scope,
            AuditFilter {
                resource: Some(AuditResource::Order),
                resource_id: Some(order.id),
                action: Some(AuditAction::Update),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let rejected: Vec<_> = rows.iter().filter(|r| !r.success).collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].severity, AuditSeverity::Warning);
}

#[tokio::test]
async fn test_filters_narrow_the_trail() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let quote = rt.quotes.create_quote(&scope, quote_input()).await.unwrap();
    rt.orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    let rows = rt
        .audit
        .query(
            &scope,
            AuditFilter {
                resource: Some(AuditResource::Quote),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].resource_id, quote.id);

    let rows = rt
        .audit
        .query(
            &scope,
            AuditFilter {
                actor_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_purge_respects_retention_window() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    rt.orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    // Fresh rows survive a purge run today.
    let purged = rt.audit.store().purge_expired(Utc::now()).await.unwrap();
    assert_eq!(purged, 0);
    assert!(!rt
        .audit
        .query(&scope, AuditFilter::default())
        .await
        .unwrap()
        .is_empty());

    // Still inside the window one day short of 7 calendar years, leap days
    // included.
    let purged = rt
        .audit
        .store()
        .purge_expired(Utc::now() + Months::new(84) - Days::new(1))
        .await
        .unwrap();
    assert_eq!(purged, 0);

    // Eight years from now everything written today is past its floor.
    let purged = rt
        .audit
        .store()
        .purge_expired(Utc::now() + Duration::days(365 * 8))
        .await
        .unwrap();
    assert!(purged > 0);
    assert!(rt
        .audit
        .query(&superuser(), AuditFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_rejected_decision_is_audited_as_warning() {
    let (rt, _) = runtime().await;
    let practice = Uuid::new_v4();
    let scope = admin(practice);

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::RequireApprovedProof))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();
    let proof = rt
        .proofs
        .upload_proof(&scope, order.id, "files/r1.pdf".into(), None)
        .await
        .unwrap();

    // Changes requested without feedback is rejected but still audited.
    rt.proofs
        .record_decision(
            &customer(practice),
            proof.id,
            ProofDecision::ChangesRequested,
            None,
        )
        .await
        .unwrap_err();

    let rows = rt
        .audit
        .query(
            &scope,
            AuditFilter {
                action: Some(AuditAction::Decide),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].success);
    assert_eq!(rows[0].severity, AuditSeverity::Warning);
}

#[tokio::test]
async fn test_audit_rows_outlive_source_row_status_changes() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Cancelled, Some("duplicate".into()))
        .await
        .unwrap();

    // Terminal order, trail intact with both mutations.
    let rows = rt
        .audit
        .query(
            &scope,
            AuditFilter {
                resource_id: Some(order.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}
