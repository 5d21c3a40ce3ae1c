//! Tenant isolation integration tests.
//!
//! Cross-practice reads must be indistinguishable from missing rows, and
//! superusers bypass practice scoping entirely.

mod common;

use uuid::Uuid;

use carepost::interfaces::CoreError;
use carepost::model::{ApprovalPolicy, AuditFilter, OrderStatus};

use common::{admin, customer, order_input, quote_input, runtime, superuser};

#[tokio::test]
async fn test_cross_practice_order_read_is_not_found() {
    let (rt, _) = runtime().await;
    let owner = admin(Uuid::new_v4());
    let intruder = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&owner, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    let err = rt.orders.get_order(&intruder, order.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    // The owner still sees it.
    assert!(rt.orders.get_order(&owner, order.id).await.is_ok());
}

#[tokio::test]
async fn test_cross_practice_quote_read_and_convert_are_not_found() {
    let (rt, _) = runtime().await;
    let owner = admin(Uuid::new_v4());
    let intruder = admin(Uuid::new_v4());

    let quote = rt.quotes.create_quote(&owner, quote_input()).await.unwrap();

    let err = rt.quotes.get_quote(&intruder, quote.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    let err = rt.quotes.convert(&intruder, quote.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_cross_practice_proof_and_history_are_not_found() {
    let (rt, _) = runtime().await;
    let owner_practice = Uuid::new_v4();
    let owner = admin(owner_practice);
    let intruder = customer(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&owner, order_input(ApprovalPolicy::RequireApprovedProof))
        .await
        .unwrap();
    rt.orders
        .transition(&owner, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();
    let proof = rt
        .proofs
        .upload_proof(&owner, order.id, "files/r1.pdf".into(), None)
        .await
        .unwrap();

    let err = rt.proofs.get_proof(&intruder, proof.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    let err = rt
        .orders
        .get_order_history(&intruder, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_listings_are_scoped_to_the_caller_practice() {
    let (rt, _) = runtime().await;
    let a = admin(Uuid::new_v4());
    let b = admin(Uuid::new_v4());

    rt.orders
        .create_order(&a, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .create_order(&a, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .create_order(&b, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    assert_eq!(rt.orders.list_orders(&a).await.unwrap().len(), 2);
    assert_eq!(rt.orders.list_orders(&b).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_superuser_sees_every_practice() {
    let (rt, _) = runtime().await;
    let a = admin(Uuid::new_v4());
    let b = admin(Uuid::new_v4());
    let root = superuser();

    let order_a = rt
        .orders
        .create_order(&a, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    let quote_b = rt.quotes.create_quote(&b, quote_input()).await.unwrap();

    assert!(rt.orders.get_order(&root, order_a.id).await.is_ok());
    assert!(rt.quotes.get_quote(&root, quote_b.id).await.is_ok());
    assert_eq!(rt.orders.list_orders(&root).await.unwrap().len(), 1);
    assert_eq!(rt.quotes.list_quotes(&root).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_queries_are_practice_scoped() {
    let (rt, _) = runtime().await;
    let a = admin(Uuid::new_v4());
    let b = admin(Uuid::new_v4());

    rt.orders
        .create_order(&a, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .create_order(&b, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    let rows_a = rt.audit.query(&a, AuditFilter::default()).await.unwrap();
    assert!(!rows_a.is_empty());
    assert!(rows_a.iter().all(|r| r.practice_id == a.practice_id));

    // Superusers see both practices' rows.
    let rows_all = rt
        .audit
        .query(&superuser(), AuditFilter::default())
        .await
        .unwrap();
    assert!(rows_all.len() > rows_a.len());
}
