#![allow(dead_code)]

use {
    axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    },
    paylock::{
        AppState,
        adapters::razorpay,
        config::Config,
        domain::id::{Email, OrderId, PaymentRef},
        domain::money::Amount,
        domain::payment::{NewPayment, NewPaymentParams, Payment, PaymentStatus},
        infra::memory::MemStore,
        infra::store::Store,
    },
    serde_json::json,
    std::sync::Arc,
    tower::ServiceExt,
    uuid::Uuid,
};

pub const TEST_SECRET: &str = "whsec_test_secret";
pub const TEST_ADMIN_TOKEN: &str = "op_test_token";

/// App wired to a fresh in-memory store: webhook secret and admin token
/// set, no verify delay, no automation target.
pub fn test_app() -> (Arc<MemStore>, Router) {
    let store = Arc::new(MemStore::new());
    let config = Config {
        razorpay_webhook_secret: Some(TEST_SECRET.to_string()),
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
        ..Config::default()
    };
    let app = paylock::router(AppState::new(store.clone(), config));
    (store, app)
}

/// Catalog the suite runs against: 1, 129.99 and 299 rupees.
/// Returns (basic, creator, pro) product ids.
pub fn seed_catalog(store: &MemStore) -> (Uuid, Uuid, Uuid) {
    let basic = store.seed_product(
        "Starter Pack",
        Amount::from_paise(100).unwrap(),
        Some("https://drive.google.com/starter"),
        true,
    );
    let creator = store.seed_product(
        "Creator Pack",
        Amount::from_paise(12999).unwrap(),
        Some("https://drive.google.com/creator"),
        true,
    );
    let pro = store.seed_product(
        "Pro Pack",
        Amount::from_paise(29900).unwrap(),
        Some("https://drive.google.com/pro"),
        true,
    );
    (basic, creator, pro)
}

/// Bare pending payment, no gateway identifiers.
pub fn make_payment(email: &str, paise: i64, status: PaymentStatus) -> NewPayment {
    make_payment_with(email, paise, status, None, None, false)
}

/// Full-control payment builder.
pub fn make_payment_with(
    email: &str,
    paise: i64,
    status: PaymentStatus,
    order_id: Option<&str>,
    payment_ref: Option<&str>,
    verified: bool,
) -> NewPayment {
    NewPayment::new(NewPaymentParams {
        email: Email::new(email).unwrap(),
        mobile_number: None,
        amount: Amount::from_paise(paise).unwrap(),
        order_id: order_id.map(|o| OrderId::new(o).unwrap()),
        payment_ref: payment_ref.map(|r| PaymentRef::new(r).unwrap()),
        status,
        verified_at: verified.then(chrono::Utc::now),
        drive_link: None,
    })
}

pub async fn insert(store: &MemStore, payment: NewPayment) -> Payment {
    store.insert_payment(payment).await.unwrap()
}

pub async fn get_payment(store: &MemStore, id: Uuid) -> Payment {
    store.payment(id).await.unwrap().expect("payment row missing")
}

/// Captured-payment event body the gateway would deliver.
pub fn captured_event(
    pay_id: &str,
    order_id: Option<&str>,
    amount_paise: i64,
    email: Option<&str>,
) -> String {
    let mut entity = json!({
        "id": pay_id,
        "status": "captured",
        "amount": amount_paise,
        "currency": "INR",
        "notes": {},
    });
    if let Some(order_id) = order_id {
        entity["order_id"] = json!(order_id);
    }
    if let Some(email) = email {
        entity["email"] = json!(email);
    }
    json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": entity } },
    })
    .to_string()
}

// ── HTTP helpers ───────────────────────────────────────────────────────────

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, body)
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Webhook delivery signed the way the gateway signs.
pub async fn post_webhook(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let signature = razorpay::sign(TEST_SECRET, body.as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/razorpay")
        .header("content-type", "application/json")
        .header("X-Razorpay-Signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Operator call with the suite's bearer token.
pub async fn post_admin(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {TEST_ADMIN_TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
