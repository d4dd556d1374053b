use {
    crate::AppState,
    crate::domain::id::UserId,
    crate::services::access,
    axum::{Json, extract::State, http::StatusCode},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub user_id: Option<String>,
    /// Rides along for log correlation only; access is keyed on the user id.
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub success: bool,
    pub product_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_access: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /access/resolve, the one trusted read path for entitlements.
/// Anything short of a verified answer is 400 with zero products: this
/// endpoint fails closed, never open.
#[tracing::instrument(
    name = "resolve_access",
    skip_all,
    fields(user_id = tracing::field::Empty, user_email = tracing::field::Empty)
)]
pub async fn access_handler(
    State(state): State<AppState>,
    Json(req): Json<AccessRequest>,
) -> (StatusCode, Json<AccessResponse>) {
    if let Some(email) = req.user_email.as_deref() {
        tracing::Span::current().record("user_email", email);
    }

    let user_id = match req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(UserId::new)
    {
        Some(Ok(user_id)) => user_id,
        Some(Err(err)) => return denied(err.to_string()),
        None => return denied("user_id is required".into()),
    };
    tracing::Span::current().record("user_id", tracing::field::display(&user_id));

    match access::resolve_access(&*state.store, &user_id).await {
        Ok(product_ids) => {
            let total = product_ids.len();
            (
                StatusCode::OK,
                Json(AccessResponse {
                    success: true,
                    product_ids,
                    total_access: Some(total),
                    error: None,
                }),
            )
        }
        Err(err) => {
            tracing::error!(error = %err, "access lookup failed, denying");
            denied("access lookup failed".into())
        }
    }
}

fn denied(error: String) -> (StatusCode, Json<AccessResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(AccessResponse {
            success: false,
            product_ids: Vec::new(),
            total_access: None,
            error: Some(error),
        }),
    )
}
