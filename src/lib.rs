pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    crate::config::Config,
    crate::infra::store::Store,
    crate::services::notify::Notifier,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        middleware,
        routing::{get, post},
    },
    std::{sync::Arc, time::Duration},
    tower_http::timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let notifier = Notifier::new(
            config.automation_webhook_url.clone(),
            config.whatsapp_community_url.clone(),
        );
        Self {
            store,
            config: Arc::new(config),
            notifier: Arc::new(notifier),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/admin/payments/{id}/verify",
            post(adapters::admin::verify_payment_handler),
        )
        .route(
            "/admin/payments/{id}/reject",
            post(adapters::admin::reject_payment_handler),
        )
        .route("/admin/recovery", post(adapters::admin::recovery_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            adapters::admin::require_admin,
        ));

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/payments", post(adapters::checkout::create_payment_handler))
        .route("/payments/verify", post(adapters::verify::verify_handler))
        .route("/access/resolve", post(adapters::access::access_handler))
        .route("/webhooks/razorpay", post(adapters::webhook::webhook_handler))
        .merge(admin)
        .layer(DefaultBodyLimit::max(64 * 1024)) // gateway events stay well under this
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
