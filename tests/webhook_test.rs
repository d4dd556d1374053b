mod common;

use {
    common::*,
    paylock::{AppState, config::Config},
    paylock::domain::payment::PaymentStatus,
    paylock::infra::memory::MemStore,
    serde_json::json,
    std::sync::Arc,
    uuid::Uuid,
};

fn payment_id_of(body: &serde_json::Value) -> Uuid {
    Uuid::parse_str(body["payment_id"].as_str().expect("payment_id in body")).unwrap()
}

// ── 25. capture_then_verify_end_to_end ─────────────────────────────────────

#[tokio::test]
async fn capture_then_verify_end_to_end() {
    let (store, app) = test_app();
    let (_, _, pro) = seed_catalog(&store);

    // Checkout initiates the pending row.
    let (status, body) = post_json(
        app.clone(),
        "/payments",
        json!({"email": "buyer@example.com", "amount_paise": 29900, "order_id": "order_1"}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], json!("pending"));
    let created = payment_id_of(&body);
    assert!(
        body["return_query"]
            .as_str()
            .unwrap()
            .starts_with(&format!("reference={created}")),
        "redirect correlation key rides in the return query"
    );

    // The gateway confirms the capture.
    let event = captured_event("pay_1", Some("order_1"), 29900, Some("buyer@example.com"));
    let (status, body) = post_webhook(app.clone(), &event).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("payment verified"));
    assert_eq!(payment_id_of(&body), created);

    let row = get_payment(&store, created).await;
    assert_eq!(row.status(), PaymentStatus::Completed);
    assert_eq!(row.payment_ref().unwrap().as_str(), "pay_1");
    assert!(row.verified_at().is_some());

    // The buyer lands back and claims access.
    let (status, body) = post_json(
        app,
        "/payments/verify",
        json!({"email": "buyer@example.com", "user_id": "u1"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["accessGranted"], json!(true));
    assert_eq!(body["debugInfo"]["productId"], json!(pro.to_string()));
    assert_eq!(body["debugInfo"]["paymentId"], json!(created.to_string()));
    assert_eq!(store.grant_count(), 1);
}

// ── 26. replayed_capture_settles_one_row ───────────────────────────────────

#[tokio::test]
async fn replayed_capture_settles_one_row() {
    let (store, app) = test_app();
    insert(
        &store,
        make_payment_with("a@b.com", 29900, PaymentStatus::Pending, Some("order_2"), None, false),
    )
    .await;

    let event = captured_event("pay_2", Some("order_2"), 29900, Some("a@b.com"));
    let (_, first) = post_webhook(app.clone(), &event).await;
    assert_eq!(first["message"], json!("payment verified"));

    let (status, second) = post_webhook(app, &event).await;
    assert_eq!(status, 200, "replays are acknowledged, not retried");
    assert_eq!(second["message"], json!("already processed"));
    assert_eq!(payment_id_of(&second), payment_id_of(&first));
    assert_eq!(store.payment_count(), 1);
}

// ── 27. other_event_types_are_acknowledged ─────────────────────────────────

#[tokio::test]
async fn other_event_types_are_acknowledged() {
    let (store, app) = test_app();

    // Same entity family, wrong event.
    let failed = json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": {
            "id": "pay_3", "status": "failed", "amount": 29900, "notes": {},
        }}},
    })
    .to_string();
    let (status, body) = post_webhook(app.clone(), &failed).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("ignored"));

    // Different entity family, payload carries no payment at all.
    let order_paid = json!({
        "event": "order.paid",
        "payload": { "order": { "entity": { "id": "order_9" } } },
    })
    .to_string();
    let (status, body) = post_webhook(app, &order_paid).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("ignored"));

    assert_eq!(store.payment_count(), 0);
}

// ── 28. unsigned_delivery_rejected ─────────────────────────────────────────

#[tokio::test]
async fn unsigned_delivery_rejected() {
    let (store, app) = test_app();
    let event = captured_event("pay_4", None, 100, Some("a@b.com"));

    let (status, body) = post_json(app, "/webhooks/razorpay", serde_json::from_str(&event).unwrap()).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], json!("invalid webhook signature"));
    assert_eq!(store.payment_count(), 0, "unauthenticated events touch nothing");
}

// ── 29. tampered_body_rejected ─────────────────────────────────────────────

#[tokio::test]
async fn tampered_body_rejected() {
    use axum::{body::Body, http::Request};
    let (store, app) = test_app();

    let signed_body = captured_event("pay_5", None, 100, Some("a@b.com"));
    // Signature computed over a different amount than the one delivered.
    let tampered = captured_event("pay_5", None, 999999, Some("a@b.com"));
    let signature = paylock::adapters::razorpay::sign(TEST_SECRET, signed_body.as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/razorpay")
        .header("content-type", "application/json")
        .header("X-Razorpay-Signature", signature)
        .body(Body::from(tampered))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], json!("invalid webhook signature"));
    assert_eq!(store.payment_count(), 0);
}

// ── 30. unconfigured_secret_disables_ingestion ─────────────────────────────

#[tokio::test]
async fn unconfigured_secret_disables_ingestion() {
    let store = Arc::new(MemStore::new());
    let app = paylock::router(AppState::new(store.clone(), Config::default()));

    let event = captured_event("pay_6", None, 100, Some("a@b.com"));
    let (status, body) = post_webhook(app, &event).await;

    assert_eq!(status, 503, "no secret means no way to authenticate anything");
    assert_eq!(body["error"], json!("webhook secret not configured"));
    assert_eq!(store.payment_count(), 0);
}

// ── 31. capture_correlates_by_order_id ─────────────────────────────────────

#[tokio::test]
async fn capture_correlates_by_order_id() {
    let (store, app) = test_app();
    let created = insert(
        &store,
        make_payment_with("a@b.com", 12999, PaymentStatus::Pending, Some("order_31"), None, false),
    )
    .await;

    // No email in the event: the order id is the only usable key.
    let event = captured_event("pay_31", Some("order_31"), 12999, None);
    let (status, body) = post_webhook(app, &event).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("payment verified"));
    assert_eq!(payment_id_of(&body), created.id());
    assert_eq!(
        get_payment(&store, created.id()).await.status(),
        PaymentStatus::Completed
    );
}

// ── 32. capture_falls_back_to_latest_pending_for_email ─────────────────────

#[tokio::test]
async fn capture_falls_back_to_latest_pending_for_email() {
    let (store, app) = test_app();
    let older = insert(&store, make_payment("a@b.com", 29900, PaymentStatus::Pending)).await;
    let newer = insert(&store, make_payment("a@b.com", 29900, PaymentStatus::Pending)).await;

    let event = captured_event("pay_32", None, 29900, Some("a@b.com"));
    let (_, body) = post_webhook(app, &event).await;

    assert_eq!(body["message"], json!("payment verified"));
    assert_eq!(payment_id_of(&body), newer.id());
    assert_eq!(get_payment(&store, newer.id()).await.status(), PaymentStatus::Completed);
    assert_eq!(
        get_payment(&store, older.id()).await.status(),
        PaymentStatus::Pending,
        "only the newest pending row is taken"
    );
}

// ── 33. unmatched_capture_records_a_completed_row ──────────────────────────

#[tokio::test]
async fn unmatched_capture_records_a_completed_row() {
    let (store, app) = test_app();
    seed_catalog(&store);

    // Hosted payment link: the capture is the first we hear of this buyer.
    let event = captured_event("pay_33", None, 29900, Some("new@b.com"));
    let (status, body) = post_webhook(app.clone(), &event).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("payment recorded"));
    let recorded = payment_id_of(&body);

    let row = get_payment(&store, recorded).await;
    assert_eq!(row.status(), PaymentStatus::Completed);
    assert_eq!(row.payment_ref().unwrap().as_str(), "pay_33");
    assert!(row.verified_at().is_some());
    assert_eq!(row.email().as_str(), "new@b.com");

    // Replay of the same event now correlates by gateway ref.
    let (_, body) = post_webhook(app.clone(), &event).await;
    assert_eq!(body["message"], json!("already processed"));
    assert_eq!(store.payment_count(), 1);

    // And the buyer can claim access off the recorded row.
    let (_, body) = post_json(
        app,
        "/payments/verify",
        json!({"email": "new@b.com", "user_id": "u33"}),
    )
    .await;
    assert_eq!(body["accessGranted"], json!(true));
}

// ── 34. unmatched_capture_without_email_is_dropped_loudly ──────────────────

#[tokio::test]
async fn unmatched_capture_without_email_is_dropped_loudly() {
    let (store, app) = test_app();

    let event = captured_event("pay_34", None, 100, None);
    let (status, body) = post_webhook(app, &event).await;

    assert_eq!(status, 200, "nothing to correlate, but no point in a gateway retry");
    assert_eq!(
        body["message"],
        json!("no payment record matched and event carries no email")
    );
    assert_eq!(store.payment_count(), 0);
}

// ── 35. capture_for_a_settled_row_leaves_it ────────────────────────────────

#[tokio::test]
async fn capture_for_a_settled_row_leaves_it() {
    let (store, app) = test_app();
    let rejected = insert(
        &store,
        make_payment_with("a@b.com", 29900, PaymentStatus::Rejected, None, Some("pay_35"), false),
    )
    .await;

    let event = captured_event("pay_35", None, 29900, Some("a@b.com"));
    let (status, body) = post_webhook(app, &event).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("payment already settled"));
    assert_eq!(
        get_payment(&store, rejected.id()).await.status(),
        PaymentStatus::Rejected,
        "an operator decision is not overturned by a late capture"
    );
}

// ── 36. capture_with_contact_persists_delivery_metadata ────────────────────

#[tokio::test]
async fn capture_with_contact_persists_delivery_metadata() {
    let (store, app) = test_app();

    let event = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": "pay_36",
            "status": "captured",
            "amount": 29900,
            "currency": "INR",
            "email": "buyer@b.com",
            "contact": "+91 98765 43210",
            "notes": {},
        }}},
    })
    .to_string();

    let (status, body) = post_webhook(app, &event).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], json!("payment recorded"));
    assert_eq!(body["delivery_method"], json!("whatsapp"));

    let row = get_payment(&store, payment_id_of(&body)).await;
    assert_eq!(row.mobile_number(), Some("+91 98765 43210"));
    assert_eq!(row.delivery_method(), Some("whatsapp"));
    assert!(row.whatsapp_sent());
    assert!(
        row.whatsapp_url().unwrap().starts_with("https://wa.me/919876543210?text="),
        "click-to-chat link is built from the digits of the contact"
    );
}
