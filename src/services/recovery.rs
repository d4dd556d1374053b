use {
    crate::domain::error::StoreError, crate::domain::id::Email, crate::domain::payment::Payment,
    crate::infra::store::Store, chrono::Utc,
};

/// Promote stuck payments (gateway confirmed, local status never flipped)
/// to `completed`. Returns the rows that this call actually promoted, fresh
/// from the store. Individual failures are logged and skipped: each
/// recovered payment independently unblocks its own grant, so partial
/// success is success. No ordering dependency between candidates.
pub async fn recover_stuck_payments(store: &dyn Store, candidates: &[Payment]) -> Vec<Payment> {
    let mut promoted = Vec::new();

    for candidate in candidates {
        if !candidate.is_stuck() {
            continue;
        }

        // The row already carries its gateway ref; the conditional update
        // stamps verified_at and refuses settled rows, so a webhook racing
        // us simply wins and we observe `false`.
        match store.complete_payment(candidate.id(), None, Utc::now()).await {
            Ok(true) => match store.payment(candidate.id()).await {
                Ok(Some(payment)) => {
                    tracing::info!(
                        payment_id = %payment.id(),
                        email = %payment.email(),
                        "recovered stuck payment"
                    );
                    promoted.push(payment);
                }
                Ok(None) => tracing::warn!(
                    payment_id = %candidate.id(),
                    "promoted payment missing on re-read"
                ),
                Err(err) => tracing::warn!(
                    payment_id = %candidate.id(),
                    error = %err,
                    "promoted payment could not be re-read"
                ),
            },
            Ok(false) => tracing::debug!(
                payment_id = %candidate.id(),
                "stuck candidate already settled, skipping"
            ),
            Err(err) => tracing::warn!(
                payment_id = %candidate.id(),
                error = %err,
                "stuck payment promotion failed"
            ),
        }
    }

    promoted
}

/// Operator-triggered variant: one bulk update scoped to an email instead
/// of row-by-row promotion. Same outcome, coarser granularity. Returns the
/// promoted-row count.
pub async fn fix_stuck_payments_by_email(
    store: &dyn Store,
    email: &Email,
) -> Result<u64, StoreError> {
    let promoted = store.promote_stuck_for_email(email, Utc::now()).await?;
    if promoted > 0 {
        tracing::info!(email = %email, promoted, "bulk-promoted stuck payments");
    }
    Ok(promoted)
}
