use {
    super::api_errors::ApiError,
    super::razorpay::{self, WebhookEvent},
    crate::AppState,
    crate::domain::error::StoreError,
    crate::domain::id::{Email, OrderId, PaymentRef},
    crate::domain::money::Amount,
    crate::domain::payment::{NewPayment, NewPaymentParams, Payment, PaymentStatus},
    crate::infra::store::Store,
    crate::services::notify::Delivery,
    axum::{Json, body::Bytes, extract::State, http::HeaderMap},
    chrono::Utc,
    serde_json::json,
    uuid::Uuid,
};

/// Gateway capture ingestion. Authenticates the delivery, correlates it to
/// a local payment row (or records one), promotes the row to completed, and
/// fires the best-effort notification. Safe under replays end to end: the
/// same event twice settles exactly one row and re-announces nothing.
#[tracing::instrument(
    name = "razorpay_webhook",
    skip_all,
    fields(event = tracing::field::Empty, payment_ref = tracing::field::Empty)
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(secret) = state.config.razorpay_webhook_secret.as_deref() else {
        return Err(ApiError::Unavailable(
            "webhook secret not configured".into(),
        ));
    };
    let signature = headers
        .get(razorpay::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Signature("missing X-Razorpay-Signature header".into()))?;
    razorpay::verify_signature(secret, &body, signature)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Invalid(format!("malformed webhook payload: {e}")))?;
    tracing::Span::current().record("event", tracing::field::display(&event.event));

    if event.event != razorpay::CAPTURED_EVENT {
        tracing::debug!("event type not handled, acknowledging");
        return Ok(Json(json!({ "message": "ignored" })));
    }

    let entity = event
        .payload
        .payment
        .map(|p| p.entity)
        .ok_or_else(|| ApiError::Invalid("capture event carries no payment entity".into()))?;
    let payment_ref = PaymentRef::new(entity.id.as_str())
        .map_err(|e| ApiError::Invalid(format!("bad gateway payment id: {e}")))?;
    tracing::Span::current().record("payment_ref", tracing::field::display(&payment_ref));
    let amount = Amount::from_paise(entity.amount)
        .map_err(|e| ApiError::Invalid(format!("bad amount: {e}")))?;

    // Correlation keys are best-effort: a malformed one degrades to absent
    // rather than failing the whole capture.
    let order_id = entity.order_id.as_deref().and_then(|raw| {
        OrderId::new(raw)
            .inspect_err(|err| tracing::warn!(order_id = raw, error = %err, "unusable order id"))
            .ok()
    });
    let email = entity.best_email().and_then(|raw| {
        Email::new(raw)
            .inspect_err(|err| tracing::warn!(error = %err, "unusable email"))
            .ok()
    });

    let store = &*state.store;
    match resolve_payment(store, &payment_ref, order_id.as_ref(), email.as_ref()).await? {
        Some(payment) => {
            if payment.amount() != amount {
                tracing::warn!(
                    payment_id = %payment.id(),
                    row_amount = %payment.amount(),
                    event_amount = %amount,
                    "captured amount differs from the recorded payment"
                );
            }

            let promoted = store
                .complete_payment(payment.id(), Some(&payment_ref), Utc::now())
                .await?;

            if promoted {
                let fresh = store.payment(payment.id()).await?.unwrap_or(payment);
                let delivery = state.notifier.notify_completed(store, &fresh).await;
                tracing::info!(payment_id = %fresh.id(), "payment captured and verified");
                return Ok(Json(capture_response(
                    "payment verified",
                    fresh.id(),
                    delivery,
                )));
            }

            // Not promoted: the row was already settled, possibly by a
            // concurrent replay of this very event. Report its fresh state.
            let status = store
                .payment(payment.id())
                .await?
                .map_or(payment.status(), |p| p.status());
            if status == PaymentStatus::Completed {
                tracing::info!(payment_id = %payment.id(), "replayed capture, already completed");
                return Ok(Json(json!({
                    "message": "already processed",
                    "payment_id": payment.id(),
                })));
            }

            tracing::warn!(
                payment_id = %payment.id(),
                status = %status,
                "capture for a payment settled as non-completed, leaving it"
            );
            Ok(Json(json!({
                "message": "payment already settled",
                "payment_id": payment.id(),
            })))
        }
        None => {
            let Some(email) = email else {
                tracing::error!(
                    "unmatched capture with no usable email, cannot record a payment"
                );
                return Ok(Json(json!({
                    "message": "no payment record matched and event carries no email",
                })));
            };

            // Defensive fallback: a capture must never be lost, even when
            // the local initiation step was skipped (hosted payment links).
            let record = NewPayment::new(NewPaymentParams {
                email,
                mobile_number: entity.best_contact().map(str::to_string),
                amount,
                order_id,
                payment_ref: Some(payment_ref),
                status: PaymentStatus::Completed,
                verified_at: Some(Utc::now()),
                drive_link: None,
            });

            match store.insert_payment(record).await {
                Ok(payment) => {
                    let delivery = state.notifier.notify_completed(store, &payment).await;
                    tracing::info!(
                        payment_id = %payment.id(),
                        "no local payment matched, recorded the capture as completed"
                    );
                    Ok(Json(capture_response(
                        "payment recorded",
                        payment.id(),
                        delivery,
                    )))
                }
                // Lost the insert race against a replay of this same event;
                // the unique gateway ref means the row already exists.
                Err(StoreError::Database(sqlx::Error::Database(db)))
                    if db.is_unique_violation() =>
                {
                    tracing::info!("concurrent replay already recorded this capture");
                    Ok(Json(json!({ "message": "already processed" })))
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Three-tier correlation: by gateway ref (replays of an event we already
/// applied), then by exact order id, then by the most recent pending row
/// for the extracted email.
async fn resolve_payment(
    store: &dyn Store,
    payment_ref: &PaymentRef,
    order_id: Option<&OrderId>,
    email: Option<&Email>,
) -> Result<Option<Payment>, StoreError> {
    if let Some(payment) = store.payment_by_ref(payment_ref).await? {
        return Ok(Some(payment));
    }
    if let Some(order_id) = order_id {
        if let Some(payment) = store.payment_by_order_id(order_id).await? {
            return Ok(Some(payment));
        }
    }
    match email {
        Some(email) => store.latest_pending_for_email(email).await,
        None => Ok(None),
    }
}

fn capture_response(
    message: &str,
    payment_id: Uuid,
    delivery: Option<Delivery>,
) -> serde_json::Value {
    let mut body = json!({ "message": message, "payment_id": payment_id });
    if let Some(delivery) = delivery {
        body["delivery_method"] = json!(delivery.method);
    }
    body
}
