use {
    crate::AppState,
    crate::domain::error::VerifyError,
    crate::services::verification::{self, Verified},
    axum::{Json, extract::State},
    serde::{Deserialize, Serialize},
    serde_json::json,
};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub user_id: Option<String>,
}

/// Client-facing verification result, camelCase on the wire. Expected
/// failures ride inside this body with HTTP 200; callers branch on
/// `success`/`accessGranted`, never on transport status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_granted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<serde_json::Value>,
}

/// POST /payments/verify. Sleeps briefly before querying so an in-flight
/// gateway webhook usually lands first; the delay is configuration, zero in
/// tests.
pub async fn verify_handler(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    if !state.config.verify_delay.is_zero() {
        tokio::time::sleep(state.config.verify_delay).await;
    }

    let result = verification::verify_and_grant_access(
        &*state.store,
        state.config.grant_policy(),
        req.email.as_deref(),
        req.user_id.as_deref(),
    )
    .await;

    Json(match result {
        Ok(Verified::Granted {
            payment_id,
            product_id,
            drive_link,
        }) => VerifyResponse {
            success: true,
            access_granted: Some(true),
            drive_link: Some(drive_link.unwrap_or_default()),
            whatsapp_group: Some(state.config.whatsapp_community_url.clone()),
            error: None,
            debug_info: Some(json!({
                "paymentId": payment_id,
                "productId": product_id,
            })),
        },
        Ok(Verified::PaymentConfirmed { payment_id }) => VerifyResponse {
            success: true,
            access_granted: Some(false),
            drive_link: None,
            whatsapp_group: None,
            error: None,
            debug_info: Some(json!({
                "paymentId": payment_id,
                "reason": "payment confirmed, log in to claim access",
            })),
        },
        Err(err) => failure_response(err),
    })
}

/// Every failure is self-diagnosing: a readable `error` plus raw state in
/// `debugInfo`, because the caller's screen is the only observability these
/// calls get.
fn failure_response(err: VerifyError) -> VerifyResponse {
    let error = err.to_string();
    let debug_info = match &err {
        VerifyError::InvalidParameters(_) | VerifyError::NoPaymentsFound => None,
        VerifyError::NoValidPayments {
            total,
            pending,
            failed,
            statuses,
        } => Some(json!({
            "totalPayments": total,
            "pendingCount": pending,
            "failedCount": failed,
            "statuses": statuses,
        })),
        VerifyError::NoProductsConfigured => None,
        VerifyError::NoMatchingProduct {
            amount_paise,
            product_count,
        } => Some(json!({
            "amountPaise": amount_paise,
            "activeProducts": product_count,
        })),
        VerifyError::AccessGrantFailed { payment_id, source } => {
            tracing::error!(payment_id = %payment_id, error = %source, "grant write failed");
            Some(json!({
                "paymentId": payment_id,
                "storeError": source.to_string(),
            }))
        }
        VerifyError::Store(source) => {
            tracing::error!(error = %source, "verification store failure");
            Some(json!({ "storeError": source.to_string() }))
        }
    };

    VerifyResponse {
        success: false,
        access_granted: Some(false),
        drive_link: None,
        whatsapp_group: None,
        error: Some(error),
        debug_info,
    }
}
