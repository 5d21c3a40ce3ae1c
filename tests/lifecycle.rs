//! Order/quote lifecycle integration tests.
//!
//! Uses an in-memory SQLite database, no external dependencies required.

mod common;

use uuid::Uuid;

use carepost::interfaces::CoreError;
use carepost::model::{
    replay_history, ApprovalPolicy, OrderStatus, ProofDecision, QuoteStatus,
};

use common::{admin, customer, event_kinds, order_input, quote_input, runtime};

#[tokio::test]
async fn test_quote_conversion_links_both_sides() {
    let (rt, seen) = runtime().await;
    let practice = Uuid::new_v4();
    let scope = admin(practice);

    let quote = rt.quotes.create_quote(&scope, quote_input()).await.unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);
    assert_eq!(quote.quote_number, 1);

    let (converted, order) = rt.quotes.convert(&scope, quote.id).await.unwrap();

    assert_eq!(converted.status, QuoteStatus::Converted);
    assert_eq!(converted.converted_order_id, Some(order.id));
    assert_eq!(order.quote_id, Some(quote.id));
    assert_eq!(order.status, OrderStatus::Draft);
    assert_eq!(order.practice_id, practice);
    assert_eq!(order.service_type, quote.service_type);
    assert_eq!(order.recipient_count, quote.recipient_count);
    assert_eq!(order.total_cost_cents, quote.total_cost_cents);

    assert!(event_kinds(&seen).contains(&"quote.converted"));
}

#[tokio::test]
async fn test_converted_quote_cannot_convert_again() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let quote = rt.quotes.create_quote(&scope, quote_input()).await.unwrap();
    rt.quotes.convert(&scope, quote.id).await.unwrap();

    let err = rt.quotes.convert(&scope, quote.id).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    // Still exactly one order points back at the quote.
    let orders = rt.orders.list_orders(&scope).await.unwrap();
    assert_eq!(
        orders.iter().filter(|o| o.quote_id == Some(quote.id)).count(),
        1
    );
}

#[tokio::test]
async fn test_archived_quote_cannot_convert() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let quote = rt.quotes.create_quote(&scope, quote_input()).await.unwrap();
    rt.quotes.archive_quote(&scope, quote.id).await.unwrap();

    let err = rt.quotes.convert(&scope, quote.id).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[tokio::test]
async fn test_full_lifecycle_with_proof_approval() {
    let (rt, seen) = runtime().await;
    let practice = Uuid::new_v4();
    let adm = admin(practice);
    let cust = customer(practice);

    let order = rt
        .orders
        .create_order(&adm, order_input(ApprovalPolicy::RequireApprovedProof))
        .await
        .unwrap();
    assert_eq!(order.order_number, 1);

    // Submit for review.
    let order = rt
        .orders
        .transition(&adm, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    // Round 1 gets approved; the order moves to production opportunistically.
    let proof = rt
        .proofs
        .upload_proof(&adm, order.id, "files/proof-r1.pdf".to_string(), None)
        .await
        .unwrap();
    rt.proofs
        .record_decision(&cust, proof.id, ProofDecision::Approved, None)
        .await
        .unwrap();

    let order = rt.orders.get_order(&adm, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::InProduction);
    assert!(order.production_start_date.is_some());

    // Complete, which stamps fulfillment.
    let order = rt
        .orders
        .transition(&adm, order.id, OrderStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.fulfilled_at.is_some());
    assert!(order.production_end_date.is_some());

    let kinds = event_kinds(&seen);
    assert!(kinds.contains(&"proof.decided"));
    assert!(kinds.iter().filter(|k| **k == "order.status_changed").count() >= 3);
}

#[tokio::test]
async fn test_production_requires_approved_proof() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::RequireApprovedProof))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();

    // No proof on file: production is unreachable.
    let err = rt
        .orders
        .transition(&scope, order.id, OrderStatus::InProduction, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_proof_optional_policy_allows_production_without_proof() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();

    let order = rt
        .orders
        .transition(&scope, order.id, OrderStatus::InProduction, None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::InProduction);
}

#[tokio::test]
async fn test_no_skip_transitions() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();

    let err = rt
        .orders
        .transition(&scope, order.id, OrderStatus::Completed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    let order = rt
        .orders
        .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
        .await
        .unwrap();
    rt.orders
        .transition(&scope, order.id, OrderStatus::Cancelled, Some("customer request".into()))
        .await
        .unwrap();

    for target in [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::InProduction,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ] {
        let err = rt
            .orders
            .transition(&scope, order.id, target, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidTransition { .. }),
            "cancelled order accepted transition to {target:?}"
        );
    }
}

#[tokio::test]
async fn test_history_replay_reproduces_current_status() {
    let (rt, _) = runtime().await;
    let practice = Uuid::new_v4();
    let adm = admin(practice);
    let cust = customer(practice);

    let quote = rt.quotes.create_quote(&adm, quote_input()).await.unwrap();
    let (_, order) = rt.quotes.convert(&adm, quote.id).await.unwrap();

    rt.orders
        .transition(&adm, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();
    let proof = rt
        .proofs
        .upload_proof(&adm, order.id, "files/r1.pdf".to_string(), None)
        .await
        .unwrap();
    rt.proofs
        .record_decision(&cust, proof.id, ProofDecision::Approved, None)
        .await
        .unwrap();

    let order = rt.orders.get_order(&adm, order.id).await.unwrap();
    let history = rt.orders.get_order_history(&adm, order.id).await.unwrap();

    // Creation row first, then every transition, ending at current status.
    assert_eq!(history.first().unwrap().from_status, None);
    assert_eq!(replay_history(&history), Some(order.status));

    // Adjacent rows chain: each from_status equals the previous to_status.
    for pair in history.windows(2) {
        assert_eq!(pair[1].from_status, Some(pair[0].to_status));
    }
}

#[tokio::test]
async fn test_writes_re_read_on_a_single_connection_pool() {
    // The fixture pool holds exactly one connection, so a store that re-reads
    // a committed row while still holding its write connection would hang
    // here and fail on the storage timeout instead of completing.
    let (rt, _) = runtime().await;
    let practice = Uuid::new_v4();
    let adm = admin(practice);

    let quote = rt.quotes.create_quote(&adm, quote_input()).await.unwrap();
    let (_, order) = rt.quotes.convert(&adm, quote.id).await.unwrap();
    rt.orders
        .transition(&adm, order.id, OrderStatus::Pending, None)
        .await
        .unwrap();
    let proof = rt
        .proofs
        .upload_proof(&adm, order.id, "files/r1.pdf".to_string(), None)
        .await
        .unwrap();
    rt.proofs
        .record_decision(&customer(practice), proof.id, ProofDecision::Approved, None)
        .await
        .unwrap();

    let order = rt.orders.get_order(&adm, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::InProduction);
}

#[tokio::test]
async fn test_order_numbers_are_sequential() {
    let (rt, _) = runtime().await;
    let scope = admin(Uuid::new_v4());

    for expected in 1..=3 {
        let order = rt
            .orders
            .create_order(&scope, order_input(ApprovalPolicy::ProofOptional))
            .await
            .unwrap();
        assert_eq!(order.order_number, expected);
    }
}
