use {
    super::api_errors::ApiError,
    crate::AppState,
    crate::domain::id::{Email, OrderId},
    crate::domain::money::Amount,
    crate::domain::payment::{NewPayment, NewPaymentParams, PaymentStatus},
    axum::{Json, extract::State, http::StatusCode},
    reqwest::Url,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    /// Either a catalog product (price and content link come from the row)…
    pub product_id: Option<Uuid>,
    /// …or a bare paise amount, for gateway-hosted payment links with no
    /// catalog row behind them.
    pub amount_paise: Option<i64>,
    /// Gateway order id when checkout went through the order-creation path.
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub payment_id: Uuid,
    pub order_id: Option<String>,
    pub amount_paise: i64,
    pub status: PaymentStatus,
    /// Query string the client appends to the gateway's return URL so the
    /// correlation key survives the redirect round-trip. Side-steps
    /// client-local storage entirely.
    pub return_query: String,
}

/// POST /payments: the pending row a checkout starts from.
pub async fn create_payment_handler(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), ApiError> {
    let email = match req.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => Email::new(e)?,
        _ => return Err(ApiError::Invalid("email is required".into())),
    };

    let (amount, drive_link) = match (req.product_id, req.amount_paise) {
        (Some(product_id), _) => {
            let product = state
                .store
                .product(product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(ApiError::NotFound("product"))?;
            (product.price, product.access_link)
        }
        (None, Some(paise)) => (Amount::from_paise(paise)?, None),
        (None, None) => {
            return Err(ApiError::Invalid(
                "product_id or amount_paise is required".into(),
            ));
        }
    };

    let order_id = req.order_id.as_deref().map(OrderId::new).transpose()?;

    let record = NewPayment::new(NewPaymentParams {
        email: email.clone(),
        mobile_number: req
            .mobile_number
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        amount,
        order_id,
        payment_ref: None,
        status: PaymentStatus::Pending,
        verified_at: None,
        drive_link,
    });

    let payment = state.store.insert_payment(record).await?;
    tracing::info!(
        payment_id = %payment.id(),
        email = %payment.email(),
        amount = %payment.amount(),
        "checkout initiated"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            payment_id: payment.id(),
            order_id: payment.order_id().map(|o| o.as_str().to_string()),
            amount_paise: payment.amount().paise(),
            status: payment.status(),
            return_query: return_query(payment.id(), &email),
        }),
    ))
}

/// Percent-encoded `reference=…&email=…` pair. Built through a throwaway
/// URL because that is the encoder already in the dependency tree.
fn return_query(payment_id: Uuid, email: &Email) -> String {
    Url::parse_with_params(
        "https://return.invalid/",
        &[
            ("reference", payment_id.to_string()),
            ("email", email.as_str().to_string()),
        ],
    )
    .map(|url| url.query().unwrap_or_default().to_string())
    .unwrap_or_default()
}
