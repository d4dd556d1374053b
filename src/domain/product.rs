use {super::money::Amount, chrono::DateTime, chrono::Utc, uuid::Uuid};

/// Catalog entry. Read-only here; the operator manages the catalog outside
/// this service. `price` is what ties an amount-only payment back to a
/// product when no explicit product id was recorded.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Amount,
    pub access_link: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price-match against a paid amount, within the one-paisa tolerance.
    pub fn matches_amount(&self, amount: Amount) -> bool {
        self.price.matches(amount)
    }
}
