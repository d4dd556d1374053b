use {
    crate::domain::error::VerifyError,
    crate::domain::grant::NewAccessGrant,
    crate::domain::id::{Email, UserId},
    crate::domain::payment::Payment,
    crate::infra::store::Store,
    crate::services::recovery,
    uuid::Uuid,
};

/// Policy knobs the engine takes from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantPolicy {
    /// Legacy behavior: when no product price matches the paid amount,
    /// grant the first active product anyway. Off by default, in which
    /// case a mismatch fails loudly with [`VerifyError::NoMatchingProduct`].
    pub fallback_to_first_product: bool,
}

/// Successful verification outcomes.
#[derive(Debug)]
pub enum Verified {
    /// A grant for the caller is in place, written by this call or a
    /// previous one. `drive_link` is the content link captured on the
    /// payment row at checkout, when there was one.
    Granted {
        payment_id: Uuid,
        product_id: Uuid,
        drive_link: Option<String>,
    },

    /// A valid completed payment exists but no user id was supplied, so
    /// nothing could be granted. Unauthenticated buyers land here and are
    /// asked to log in and verify again.
    PaymentConfirmed { payment_id: Uuid },
}

impl Verified {
    pub fn payment_id(&self) -> Uuid {
        match self {
            Self::Granted { payment_id, .. } | Self::PaymentConfirmed { payment_id } => {
                *payment_id
            }
        }
    }
}

/// Decide, from the payment rows correlated by email, whether this caller
/// is entitled to a product, and write the grant at most once.
///
/// The sequence: fetch newest-first, keep rows passing the dual validity
/// condition, attempt stuck-payment recovery when none do, then treat the
/// most recent valid payment as authoritative. Recency wins over amount or
/// explicit selection; a buyer with several completed payments gets the
/// newest one processed per call.
///
/// Re-entrant by construction: every failure leaves the store in a state
/// from which re-running the same call converges (completions are
/// conditional updates, grants are conflict-ignore inserts).
pub async fn verify_and_grant_access(
    store: &dyn Store,
    policy: GrantPolicy,
    email: Option<&str>,
    user_id: Option<&str>,
) -> Result<Verified, VerifyError> {
    let email = match email.map(str::trim) {
        Some(e) if !e.is_empty() => Email::new(e)?,
        _ => return Err(VerifyError::InvalidParameters("email is required".into())),
    };
    let user_id = user_id
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(UserId::new)
        .transpose()?;

    let payments = store.payments_for_email(&email).await?;
    if payments.is_empty() {
        return Err(VerifyError::NoPaymentsFound);
    }

    let mut valid: Vec<Payment> = payments
        .iter()
        .filter(|p| p.is_verified_complete())
        .cloned()
        .collect();

    if valid.is_empty() {
        let stuck: Vec<Payment> = payments.iter().filter(|p| p.is_stuck()).cloned().collect();
        if !stuck.is_empty() {
            tracing::info!(
                email = %email,
                candidates = stuck.len(),
                "no valid payments, attempting stuck-payment recovery"
            );
            valid.extend(recovery::recover_stuck_payments(store, &stuck).await);
        }
    }

    // `payments` is newest first and both filters preserve order, so the
    // head of `valid` is the most recent authoritative payment.
    let Some(payment) = valid.into_iter().next() else {
        let pending = payments.iter().filter(|p| p.status().is_open()).count();
        let failed = payments.iter().filter(|p| p.status().is_failure()).count();
        return Err(VerifyError::NoValidPayments {
            total: payments.len(),
            pending,
            failed,
            statuses: payments.iter().map(Payment::status).collect(),
        });
    };

    let Some(user_id) = user_id else {
        tracing::info!(
            payment_id = %payment.id(),
            email = %email,
            "payment confirmed without user id, nothing granted"
        );
        return Ok(Verified::PaymentConfirmed {
            payment_id: payment.id(),
        });
    };

    grant_access(store, policy, &user_id, &payment).await
}

/// Match the authoritative payment to a product and settle the grant.
async fn grant_access(
    store: &dyn Store,
    policy: GrantPolicy,
    user_id: &UserId,
    payment: &Payment,
) -> Result<Verified, VerifyError> {
    let products = store.active_products().await?;
    if products.is_empty() {
        return Err(VerifyError::NoProductsConfigured);
    }

    // Amount-to-product matching: payments historically carry no product
    // id, so the paid amount is the only signal.
    let product = match products
        .iter()
        .find(|p| p.matches_amount(payment.amount()))
    {
        Some(product) => product,
        None if policy.fallback_to_first_product => {
            let first = &products[0];
            tracing::warn!(
                payment_id = %payment.id(),
                amount = %payment.amount(),
                product_id = %first.id,
                "no product matches the paid amount, falling back to first active product"
            );
            first
        }
        None => {
            return Err(VerifyError::NoMatchingProduct {
                amount_paise: payment.amount().paise(),
                product_count: products.len(),
            });
        }
    };

    let granted = Verified::Granted {
        payment_id: payment.id(),
        product_id: product.id,
        drive_link: payment.drive_link().map(str::to_string),
    };

    // Existence check first (the idempotent no-op path), then a
    // conflict-ignore insert so two racers still produce one row.
    if store.grant_exists(user_id, product.id).await? {
        tracing::debug!(
            user_id = %user_id,
            product_id = %product.id,
            "grant already present"
        );
        return Ok(granted);
    }

    let grant = NewAccessGrant::new(user_id.clone(), product.id, Some(payment.id()));
    match store.insert_grant(grant).await {
        Ok(outcome) => {
            tracing::info!(
                user_id = %user_id,
                product_id = %product.id,
                payment_id = %payment.id(),
                ?outcome,
                "access grant settled"
            );
            Ok(granted)
        }
        // The payment stays completed; the caller retries and converges.
        Err(source) => Err(VerifyError::AccessGrantFailed {
            payment_id: payment.id(),
            source,
        }),
    }
}
