use {
    super::store::Store,
    crate::domain::error::StoreError,
    crate::domain::grant::{AccessGrant, GrantOutcome, GrantedAccess, NewAccessGrant},
    crate::domain::id::{Email, OrderId, PaymentRef, UserId},
    crate::domain::money::Amount,
    crate::domain::payment::{NewPayment, Payment, PaymentStatus},
    crate::domain::product::Product,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    std::collections::HashSet,
    std::sync::{Mutex, MutexGuard},
    uuid::Uuid,
};

/// Operations the test suite can force to fail, to exercise the engine's
/// store-error paths without a real backend misbehaving on cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failpoint {
    InsertGrant,
    GrantsForUser,
    PaymentsForEmail,
}

#[derive(Default)]
struct State {
    payments: Vec<Payment>,
    products: Vec<Product>,
    grants: Vec<AccessGrant>,
    failpoints: HashSet<Failpoint>,
}

/// In-memory rendition of the hosted store. Single mutex over all tables:
/// check-then-insert sequences inside one method hold the guard across both
/// steps, giving the same atomicity the UNIQUE constraint gives Postgres.
#[derive(Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mem store mutex poisoned")
    }

    fn check(&self, op: Failpoint) -> Result<(), StoreError> {
        if self.state().failpoints.contains(&op) {
            return Err(StoreError::Unavailable(format!("failpoint armed: {op:?}")));
        }
        Ok(())
    }

    /// Make `op` fail until disarmed.
    pub fn arm_failpoint(&self, op: Failpoint) {
        self.state().failpoints.insert(op);
    }

    pub fn disarm_failpoint(&self, op: Failpoint) {
        self.state().failpoints.remove(&op);
    }

    /// Seed one catalog row, returning its id.
    pub fn seed_product(
        &self,
        name: &str,
        price: Amount,
        access_link: Option<&str>,
        is_active: bool,
    ) -> Uuid {
        let id = Uuid::now_v7();
        self.state().products.push(Product {
            id,
            name: name.to_string(),
            price,
            access_link: access_link.map(str::to_string),
            is_active,
            created_at: Utc::now(),
        });
        id
    }

    pub fn payment_count(&self) -> usize {
        self.state().payments.len()
    }

    pub fn grant_count(&self) -> usize {
        self.state().grants.len()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let row = payment.into_payment(Utc::now());
        self.state().payments.push(row.clone());
        Ok(row)
    }

    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self.state().payments.iter().find(|p| p.id() == id).cloned())
    }

    async fn payments_for_email(&self, email: &Email) -> Result<Vec<Payment>, StoreError> {
        self.check(Failpoint::PaymentsForEmail)?;
        // Insertion order doubles as creation order; reverse it for
        // newest-first.
        Ok(self
            .state()
            .payments
            .iter()
            .rev()
            .filter(|p| p.email() == email)
            .cloned()
            .collect())
    }

    async fn payment_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.order_id() == Some(order_id))
            .cloned())
    }

    async fn payment_by_ref(
        &self,
        payment_ref: &PaymentRef,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.payment_ref() == Some(payment_ref))
            .cloned())
    }

    async fn latest_pending_for_email(
        &self,
        email: &Email,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .iter()
            .rev()
            .find(|p| p.email() == email && p.status() == PaymentStatus::Pending)
            .cloned())
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        payment_ref: Option<&PaymentRef>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        let Some(row) = state.payments.iter_mut().find(|p| p.id() == id) else {
            return Ok(false);
        };
        Ok(row.complete(payment_ref.cloned(), at).is_ok())
    }

    async fn settle_payment(&self, id: Uuid, status: PaymentStatus) -> Result<bool, StoreError> {
        // Completion goes through complete_payment, which stamps verified_at.
        if !status.is_failure() {
            return Ok(false);
        }
        let mut state = self.state();
        let Some(row) = state.payments.iter_mut().find(|p| p.id() == id) else {
            return Ok(false);
        };
        Ok(row.transition_status(status).is_ok())
    }

    async fn promote_stuck_for_email(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.state();
        let mut promoted = 0;
        for row in state.payments.iter_mut() {
            if row.email() == email && row.is_stuck() && row.complete(None, at).is_ok() {
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        method: &str,
        url: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        if let Some(row) = state.payments.iter_mut().find(|p| p.id() == id) {
            row.record_delivery(method, url.map(str::to_string));
        }
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.state().products.iter().find(|p| p.id == id).cloned())
    }

    async fn active_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .state()
            .products
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn grant_exists(
        &self,
        user_id: &UserId,
        product_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state()
            .grants
            .iter()
            .any(|g| &g.user_id == user_id && g.product_id == product_id))
    }

    async fn insert_grant(&self, grant: NewAccessGrant) -> Result<GrantOutcome, StoreError> {
        self.check(Failpoint::InsertGrant)?;
        let mut state = self.state();
        // Existence check and insert under one guard: the in-memory stand-in
        // for UNIQUE(user_id, product_id) + ON CONFLICT DO NOTHING.
        let taken = state
            .grants
            .iter()
            .any(|g| &g.user_id == grant.user_id() && g.product_id == grant.product_id());
        if taken {
            return Ok(GrantOutcome::AlreadyGranted);
        }
        state.grants.push(grant.into_grant(Utc::now()));
        Ok(GrantOutcome::Inserted)
    }

    async fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<GrantedAccess>, StoreError> {
        self.check(Failpoint::GrantsForUser)?;
        let state = self.state();
        Ok(state
            .grants
            .iter()
            .filter(|g| &g.user_id == user_id)
            .map(|g| GrantedAccess {
                grant: g.clone(),
                payment: g
                    .payment_id
                    .and_then(|pid| state.payments.iter().find(|p| p.id() == pid).cloned()),
            })
            .collect())
    }
}
