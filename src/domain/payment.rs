use {
    super::error::DomainError,
    super::id::{Email, OrderId, PaymentRef},
    super::money::Amount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PendingVerification,
    Completed,
    Failed,
    Cancelled,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Still awaiting an outcome: webhook delivery, gateway settlement, or
    /// an operator decision.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::PendingVerification)
    }

    /// Settled without granting anything.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Rejected)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Transitions are monotonic: open states settle exactly once, settled
    /// states never move again.
    pub fn can_transition_to(&self, new: &PaymentStatus) -> bool {
        match self {
            Self::Pending => new.is_terminal() || *new == Self::PendingVerification,
            Self::PendingVerification => new.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_verification" => Ok(Self::PendingVerification),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Full payment record from the store (for reads).
#[derive(Debug, Clone)]
pub struct Payment {
    id: Uuid,
    email: Email,
    mobile_number: Option<String>,
    amount: Amount,
    order_id: Option<OrderId>,
    payment_ref: Option<PaymentRef>,
    status: PaymentStatus,
    verified_at: Option<DateTime<Utc>>,
    drive_link: Option<String>,
    delivery_method: Option<String>,
    whatsapp_sent: bool,
    whatsapp_url: Option<String>,
    created_at: DateTime<Utc>,
}

/// Field bundle for reconstructing a `Payment` from a persisted row. The
/// store impls parse raw columns into domain types first, then assemble.
pub struct PaymentParts {
    pub id: Uuid,
    pub email: Email,
    pub mobile_number: Option<String>,
    pub amount: Amount,
    pub order_id: Option<OrderId>,
    pub payment_ref: Option<PaymentRef>,
    pub status: PaymentStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub drive_link: Option<String>,
    pub delivery_method: Option<String>,
    pub whatsapp_sent: bool,
    pub whatsapp_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn from_parts(parts: PaymentParts) -> Self {
        Self {
            id: parts.id,
            email: parts.email,
            mobile_number: parts.mobile_number,
            amount: parts.amount,
            order_id: parts.order_id,
            payment_ref: parts.payment_ref,
            status: parts.status,
            verified_at: parts.verified_at,
            drive_link: parts.drive_link,
            delivery_method: parts.delivery_method,
            whatsapp_sent: parts.whatsapp_sent,
            whatsapp_url: parts.whatsapp_url,
            created_at: parts.created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn mobile_number(&self) -> Option<&str> {
        self.mobile_number.as_deref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn payment_ref(&self) -> Option<&PaymentRef> {
        self.payment_ref.as_ref()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn drive_link(&self) -> Option<&str> {
        self.drive_link.as_deref()
    }

    pub fn delivery_method(&self) -> Option<&str> {
        self.delivery_method.as_deref()
    }

    pub fn whatsapp_sent(&self) -> bool {
        self.whatsapp_sent
    }

    pub fn whatsapp_url(&self) -> Option<&str> {
        self.whatsapp_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The dual validity condition. Webhook completions carry a gateway
    /// `pay_` ref; manual admin completions carry `verified_at` but possibly
    /// no ref yet. Either arm proves the payment.
    pub fn is_verified_complete(&self) -> bool {
        self.status == PaymentStatus::Completed
            && (self.payment_ref.is_some() || self.verified_at.is_some())
    }

    /// Gateway confirmed (a `pay_` ref landed) but the webhook never flipped
    /// the local status. These are the recovery candidates.
    pub fn is_stuck(&self) -> bool {
        self.status == PaymentStatus::Pending && self.payment_ref.is_some()
    }

    pub fn transition_status(&mut self, new: PaymentStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(&new) {
            return Err(DomainError::Transition {
                from: self.status,
                to: new,
            });
        }
        self.status = new;
        Ok(())
    }

    /// Promote to `Completed`: stamps `verified_at` (if unset) and attaches
    /// the gateway ref (if given and unset). Completed rows always end up
    /// with a `verified_at`.
    pub fn complete(
        &mut self,
        payment_ref: Option<PaymentRef>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_status(PaymentStatus::Completed)?;
        if self.verified_at.is_none() {
            self.verified_at = Some(at);
        }
        if self.payment_ref.is_none() {
            self.payment_ref = payment_ref;
        }
        Ok(())
    }

    /// Record how the buyer was notified about their content.
    pub fn record_delivery(&mut self, method: &str, url: Option<String>) {
        self.delivery_method = Some(method.to_string());
        self.whatsapp_url = url;
        self.whatsapp_sent = true;
    }
}

/// For INSERT; id generated in Rust via `Uuid::now_v7()`.
#[derive(Debug, Clone)]
pub struct NewPayment {
    id: Uuid,
    email: Email,
    mobile_number: Option<String>,
    amount: Amount,
    order_id: Option<OrderId>,
    payment_ref: Option<PaymentRef>,
    status: PaymentStatus,
    verified_at: Option<DateTime<Utc>>,
    drive_link: Option<String>,
}

pub struct NewPaymentParams {
    pub email: Email,
    pub mobile_number: Option<String>,
    pub amount: Amount,
    pub order_id: Option<OrderId>,
    pub payment_ref: Option<PaymentRef>,
    pub status: PaymentStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub drive_link: Option<String>,
}

impl NewPayment {
    pub fn new(params: NewPaymentParams) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: params.email,
            mobile_number: params.mobile_number,
            amount: params.amount,
            order_id: params.order_id,
            payment_ref: params.payment_ref,
            status: params.status,
            verified_at: params.verified_at,
            drive_link: params.drive_link,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn mobile_number(&self) -> Option<&str> {
        self.mobile_number.as_deref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn payment_ref(&self) -> Option<&PaymentRef> {
        self.payment_ref.as_ref()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn drive_link(&self) -> Option<&str> {
        self.drive_link.as_deref()
    }

    /// Materialize the row a store insert produces.
    pub fn into_payment(self, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id: self.id,
            email: self.email,
            mobile_number: self.mobile_number,
            amount: self.amount,
            order_id: self.order_id,
            payment_ref: self.payment_ref,
            status: self.status,
            verified_at: self.verified_at,
            drive_link: self.drive_link,
            delivery_method: None,
            whatsapp_sent: false,
            whatsapp_url: None,
            created_at,
        }
    }
}
