mod common;

use {
    common::*,
    paylock::domain::grant::NewAccessGrant,
    paylock::domain::id::UserId,
    paylock::domain::money::Amount,
    paylock::domain::payment::PaymentStatus,
    paylock::infra::memory::{Failpoint, MemStore},
    paylock::infra::store::Store,
    paylock::services::access::resolve_access,
    serde_json::json,
    uuid::Uuid,
};

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

// ── 20. resolves_products_backed_by_valid_payments ─────────────────────────

#[tokio::test]
async fn resolves_products_backed_by_valid_payments() {
    let store = MemStore::new();
    let (_, creator, _) = seed_catalog(&store);
    let payment = insert(
        &store,
        make_payment_with("a@b.com", 12999, PaymentStatus::Completed, None, Some("pay_a1"), false),
    )
    .await;
    store
        .insert_grant(NewAccessGrant::new(user("u1"), creator, Some(payment.id())))
        .await
        .unwrap();

    let products = resolve_access(&store, &user("u1")).await.unwrap();
    assert_eq!(products, vec![creator]);

    // Other users see nothing.
    assert!(resolve_access(&store, &user("u2")).await.unwrap().is_empty());
}

// ── 21. excludes_grants_without_a_proven_payment ───────────────────────────

#[tokio::test]
async fn excludes_grants_without_a_proven_payment() {
    let store = MemStore::new();
    let (basic, creator, pro) = seed_catalog(&store);
    let extra = store.seed_product("Legacy Pack", Amount::from_paise(50000).unwrap(), None, true);
    let orphan = store.seed_product("Orphan Pack", Amount::from_paise(60000).unwrap(), None, true);
    let u = user("u1");

    // The one grant that should survive: completed payment with a ref.
    let valid = insert(
        &store,
        make_payment_with("a@b.com", 12999, PaymentStatus::Completed, None, Some("pay_ok"), false),
    )
    .await;
    store
        .insert_grant(NewAccessGrant::new(u.clone(), creator, Some(valid.id())))
        .await
        .unwrap();

    // Backed by a payment that never completed.
    let pending = insert(&store, make_payment("a@b.com", 100, PaymentStatus::Pending)).await;
    store
        .insert_grant(NewAccessGrant::new(u.clone(), basic, Some(pending.id())))
        .await
        .unwrap();

    // Completed but carrying neither a gateway ref nor verified_at.
    let unproven = insert(
        &store,
        make_payment_with("a@b.com", 29900, PaymentStatus::Completed, None, None, false),
    )
    .await;
    store
        .insert_grant(NewAccessGrant::new(u.clone(), pro, Some(unproven.id())))
        .await
        .unwrap();

    // Legacy row with no payment recorded at all.
    store
        .insert_grant(NewAccessGrant::new(u.clone(), extra, None))
        .await
        .unwrap();

    // Points at a payment row that no longer exists.
    store
        .insert_grant(NewAccessGrant::new(u.clone(), orphan, Some(Uuid::now_v7())))
        .await
        .unwrap();

    let products = resolve_access(&store, &u).await.unwrap();
    assert_eq!(products, vec![creator], "only the proven grant survives");
}

// ── 22. resolve_endpoint_shape ─────────────────────────────────────────────

#[tokio::test]
async fn resolve_endpoint_shape() {
    let (store, app) = test_app();
    let (_, creator, _) = seed_catalog(&store);
    let payment = insert(
        &store,
        make_payment_with("a@b.com", 12999, PaymentStatus::Completed, None, Some("pay_h1"), false),
    )
    .await;
    store
        .insert_grant(NewAccessGrant::new(user("u1"), creator, Some(payment.id())))
        .await
        .unwrap();

    let (status, body) = post_json(
        app,
        "/access/resolve",
        json!({"user_id": "u1", "user_email": "a@b.com"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["productIds"], json!([creator.to_string()]));
    assert_eq!(body["totalAccess"], json!(1));
    assert!(body.get("error").is_none());
}

// ── 23. resolve_requires_a_user_id ─────────────────────────────────────────

#[tokio::test]
async fn resolve_requires_a_user_id() {
    let (_, app) = test_app();

    for body in [json!({}), json!({"user_id": "   "})] {
        let (status, body) = post_json(app.clone(), "/access/resolve", body).await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["productIds"], json!([]));
        assert_eq!(body["error"], json!("user_id is required"));
    }
}

// ── 24. store_failure_denies_instead_of_guessing ───────────────────────────

#[tokio::test]
async fn store_failure_denies_instead_of_guessing() {
    let (store, app) = test_app();
    let (_, creator, _) = seed_catalog(&store);
    let payment = insert(
        &store,
        make_payment_with("a@b.com", 12999, PaymentStatus::Completed, None, Some("pay_h2"), false),
    )
    .await;
    store
        .insert_grant(NewAccessGrant::new(user("u1"), creator, Some(payment.id())))
        .await
        .unwrap();

    store.arm_failpoint(Failpoint::GrantsForUser);
    let (status, body) = post_json(app.clone(), "/access/resolve", json!({"user_id": "u1"})).await;

    assert_eq!(status, 400, "a degraded store must not look like access");
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["productIds"], json!([]));

    // Same request once the store is healthy again.
    store.disarm_failpoint(Failpoint::GrantsForUser);
    let (status, body) = post_json(app, "/access/resolve", json!({"user_id": "u1"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["productIds"], json!([creator.to_string()]));
}
