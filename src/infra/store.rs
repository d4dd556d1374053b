use {
    crate::domain::error::StoreError,
    crate::domain::grant::{GrantOutcome, GrantedAccess, NewAccessGrant},
    crate::domain::id::{Email, OrderId, PaymentRef, UserId},
    crate::domain::payment::{NewPayment, Payment, PaymentStatus},
    crate::domain::product::Product,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// The query layer over the hosted store: read/write accessors, no policy.
/// Everything the verification engine, recovery, webhook handler, and
/// resolver know about persistence goes through this seam, which is what
/// lets the test suite run against [`MemStore`](crate::infra::memory::MemStore)
/// while production talks to Postgres.
#[async_trait]
pub trait Store: Send + Sync {
    // ── payments ──────────────────────────────────────────────────────────

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;

    /// All purchase attempts for an email, newest first.
    async fn payments_for_email(&self, email: &Email) -> Result<Vec<Payment>, StoreError>;

    async fn payment_by_order_id(&self, order_id: &OrderId)
    -> Result<Option<Payment>, StoreError>;

    async fn payment_by_ref(&self, payment_ref: &PaymentRef)
    -> Result<Option<Payment>, StoreError>;

    /// Most recent `pending` row for an email, the webhook's second-tier
    /// correlation when no order id matches.
    async fn latest_pending_for_email(&self, email: &Email)
    -> Result<Option<Payment>, StoreError>;

    /// Promote an open payment to `completed`, stamping `verified_at` and
    /// attaching the gateway ref when the row has none. Returns whether this
    /// call performed the promotion; settled rows are left untouched, which
    /// is what makes webhook replays and double recovery no-ops.
    async fn complete_payment(
        &self,
        id: Uuid,
        payment_ref: Option<&PaymentRef>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Move an open payment to a non-completed terminal status (operator
    /// reject, gateway failure, user cancel). Returns whether a row changed.
    async fn settle_payment(&self, id: Uuid, status: PaymentStatus) -> Result<bool, StoreError>;

    /// Bulk variant of stuck-payment promotion, scoped to one email.
    /// Returns the number of promoted rows.
    async fn promote_stuck_for_email(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    async fn record_delivery(
        &self,
        id: Uuid,
        method: &str,
        url: Option<&str>,
    ) -> Result<(), StoreError>;

    // ── products ──────────────────────────────────────────────────────────

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn active_products(&self) -> Result<Vec<Product>, StoreError>;

    // ── grants ────────────────────────────────────────────────────────────

    async fn grant_exists(&self, user_id: &UserId, product_id: Uuid)
    -> Result<bool, StoreError>;

    /// Conflict-ignore insert: at most one grant per (user, product) ever
    /// lands, no matter how many calls race.
    async fn insert_grant(&self, grant: NewAccessGrant) -> Result<GrantOutcome, StoreError>;

    /// Grants for a user, each joined to its backing payment.
    async fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<GrantedAccess>, StoreError>;
}
