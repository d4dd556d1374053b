use {
    super::api_errors::ApiError,
    hmac::{Hmac, Mac},
    serde::Deserialize,
    sha2::Sha256,
    std::collections::HashMap,
};

type HmacSha256 = Hmac<Sha256>;

/// The only event this service acts on; everything else is acknowledged
/// and dropped.
pub const CAPTURED_EVENT: &str = "payment.captured";

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Gateway webhook envelope:
/// `{event, payload: {payment: {entity: {...}}}}`.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

/// Other event families put their entity under a different key
/// (`payload.order`, `payload.refund`). Keeping `payment` optional lets
/// those parse far enough to be acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    /// Gateway payment id, `pay_…`.
    pub id: String,
    /// `order_…`, present only when checkout went through our own
    /// order-creation path.
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Paise.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub notes: Notes,
}

/// Free-form merchant notes. The gateway serializes them as an object when
/// populated and as an empty array when not, so both shapes must parse.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Notes {
    Map(HashMap<String, serde_json::Value>),
    List(Vec<serde_json::Value>),
}

impl Default for Notes {
    fn default() -> Self {
        Notes::Map(HashMap::new())
    }
}

impl Notes {
    fn get_str(&self, key: &str) -> Option<&str> {
        match self {
            Notes::Map(map) => map.get(key).and_then(|v| v.as_str()),
            Notes::List(_) => None,
        }
    }
}

impl PaymentEntity {
    /// Correlation email: the entity's own field, else whatever the
    /// checkout stashed in notes.
    pub fn best_email(&self) -> Option<&str> {
        non_blank(self.email.as_deref()).or_else(|| non_blank(self.notes.get_str("email")))
    }

    /// Contact number with the same entity-then-notes fallback.
    pub fn best_contact(&self) -> Option<&str> {
        non_blank(self.contact.as_deref())
            .or_else(|| non_blank(self.notes.get_str("contact")))
            .or_else(|| non_blank(self.notes.get_str("phone")))
            .or_else(|| non_blank(self.notes.get_str("mobile")))
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Authenticate a webhook delivery: the signature header must be the hex
/// HMAC-SHA256 of the raw body under the shared secret. Comparison happens
/// inside the Mac, in constant time. Unsigned or mis-signed requests never
/// reach payment processing.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), ApiError> {
    let claimed = hex::decode(signature.trim())
        .map_err(|_| ApiError::Signature("signature is not valid hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Signature(format!("unusable webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&claimed)
        .map_err(|_| ApiError::Signature("signature does not match body".into()))
}

/// Test/client helper: produce the signature `verify_signature` accepts.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
