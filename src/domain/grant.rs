use {
    super::id::UserId,
    super::payment::Payment,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// One (user, product) entitlement. Written at most once, never updated,
/// never revoked by this service.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub id: Uuid,
    pub user_id: UserId,
    pub product_id: Uuid,
    /// Payment that justified the grant. NULL only on manual/legacy rows;
    /// the resolver treats those as unprovable and excludes them.
    pub payment_id: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
}

/// For INSERT; id generated in Rust via `Uuid::now_v7()`.
#[derive(Debug, Clone)]
pub struct NewAccessGrant {
    id: Uuid,
    user_id: UserId,
    product_id: Uuid,
    payment_id: Option<Uuid>,
}

impl NewAccessGrant {
    pub fn new(user_id: UserId, product_id: Uuid, payment_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            product_id,
            payment_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn product_id(&self) -> Uuid {
        self.product_id
    }

    pub fn payment_id(&self) -> Option<Uuid> {
        self.payment_id
    }

    pub fn into_grant(self, granted_at: DateTime<Utc>) -> AccessGrant {
        AccessGrant {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            payment_id: self.payment_id,
            granted_at,
        }
    }
}

/// Result of a conflict-ignore grant insert. Two racers both pass the
/// existence check; the unique constraint decides, and the loser sees
/// `AlreadyGranted` instead of an error.
#[derive(Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    Inserted,
    AlreadyGranted,
}

/// A grant joined to its backing payment, as the resolver reads them.
#[derive(Debug, Clone)]
pub struct GrantedAccess {
    pub grant: AccessGrant,
    pub payment: Option<Payment>,
}

impl GrantedAccess {
    /// Read-time re-validation: the grant counts only if its backing payment
    /// still satisfies the dual validity condition. Fail closed on rows with
    /// no backing payment.
    pub fn is_valid(&self) -> bool {
        self.payment
            .as_ref()
            .is_some_and(Payment::is_verified_complete)
    }
}
