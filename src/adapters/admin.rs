use {
    super::api_errors::ApiError,
    crate::AppState,
    crate::domain::id::Email,
    crate::domain::payment::PaymentStatus,
    crate::services::recovery,
    axum::{
        Json,
        extract::{Path, Request, State},
        middleware::Next,
        response::Response,
    },
    chrono::Utc,
    serde::Deserialize,
    serde_json::json,
    uuid::Uuid,
};

/// Bearer-token gate in front of every operator route. A deployment with no
/// `ADMIN_TOKEN` keeps the surface switched off rather than open.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(ApiError::Unavailable(
            "admin surface disabled: no admin token configured".into(),
        ));
    };

    let provided = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Manual completion for ambiguous payments: stamps `verified_at`, needs no
/// gateway ref. This is the path that makes the `verified_at` arm of the
/// validity condition reachable.
pub async fn verify_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = &*state.store;
    let payment = store
        .payment(id)
        .await?
        .ok_or(ApiError::NotFound("payment"))?;

    if store.complete_payment(id, None, Utc::now()).await? {
        let fresh = store.payment(id).await?.unwrap_or(payment);
        let delivery = state.notifier.notify_completed(store, &fresh).await;
        tracing::info!(payment_id = %id, "payment manually verified");
        let mut body = json!({
            "message": "payment verified",
            "payment_id": id,
            "status": PaymentStatus::Completed,
        });
        if let Some(delivery) = delivery {
            body["delivery_method"] = json!(delivery.method);
        }
        return Ok(Json(body));
    }

    let status = store.payment(id).await?.map_or(payment.status(), |p| p.status());
    if status == PaymentStatus::Completed {
        Ok(Json(json!({ "message": "already completed", "payment_id": id })))
    } else {
        Err(ApiError::Conflict(format!(
            "payment already settled as {status}"
        )))
    }
}

pub async fn reject_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = &*state.store;
    let payment = store
        .payment(id)
        .await?
        .ok_or(ApiError::NotFound("payment"))?;

    if store.settle_payment(id, PaymentStatus::Rejected).await? {
        tracing::info!(payment_id = %id, "payment rejected");
        return Ok(Json(json!({
            "message": "payment rejected",
            "payment_id": id,
            "status": PaymentStatus::Rejected,
        })));
    }

    let status = store.payment(id).await?.map_or(payment.status(), |p| p.status());
    if status == PaymentStatus::Rejected {
        Ok(Json(json!({ "message": "already rejected", "payment_id": id })))
    } else {
        Err(ApiError::Conflict(format!(
            "payment already settled as {status}"
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecoveryRequest {
    pub email: String,
}

/// Bulk stuck-payment promotion for one buyer, from the operator panel.
pub async fn recovery_handler(
    State(state): State<AppState>,
    Json(req): Json<RecoveryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = Email::new(req.email.as_str())?;
    let promoted = recovery::fix_stuck_payments_by_email(&*state.store, &email).await?;
    Ok(Json(json!({
        "message": "recovery complete",
        "promoted": promoted,
    })))
}
