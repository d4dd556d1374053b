use {
    crate::domain::error::StoreError, crate::domain::id::UserId, crate::infra::store::Store,
    uuid::Uuid,
};

/// The trusted answer to "which products may this user access". Every grant
/// is re-validated against its backing payment at read time; the write-time
/// rule applied again, so a row written under looser historical rules still
/// has to prove itself on every read. Rows with no backing payment prove
/// nothing and contribute nothing.
///
/// Callers must treat an `Err` as zero access, never as "keep whatever you
/// showed last time".
pub async fn resolve_access(store: &dyn Store, user_id: &UserId) -> Result<Vec<Uuid>, StoreError> {
    let grants = store.grants_for_user(user_id).await?;
    let product_ids: Vec<Uuid> = grants
        .iter()
        .filter(|g| g.is_valid())
        .map(|g| g.grant.product_id)
        .collect();

    tracing::debug!(
        user_id = %user_id,
        grants = grants.len(),
        valid = product_ids.len(),
        "resolved access"
    );
    Ok(product_ids)
}
