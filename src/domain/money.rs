use {
    super::error::DomainError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Price comparison slack: 0.01 rupees. Payments recorded as decimal rupees
/// and amounts delivered as integer paise round differently; anything within
/// one paisa is the same price.
pub const MATCH_TOLERANCE_PAISE: i64 = 1;

/// A currency amount in integer paise. The hosted table stores decimal
/// rupees; conversion happens at the query boundary, never in policy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn from_paise(paise: i64) -> Result<Self, DomainError> {
        if paise < 0 {
            return Err(DomainError::Validation(format!(
                "Amount cannot be negative, got: {paise}"
            )));
        }
        Ok(Self(paise))
    }

    /// Rounds to the nearest paisa. Used where the outside world speaks
    /// decimal rupees (product prices, operator input).
    pub fn from_rupees(rupees: f64) -> Result<Self, DomainError> {
        if !rupees.is_finite() || rupees < 0.0 {
            return Err(DomainError::Validation(format!(
                "Amount cannot be negative or non-finite, got: {rupees}"
            )));
        }
        Ok(Self((rupees * 100.0).round() as i64))
    }

    pub fn paise(&self) -> i64 {
        self.0
    }

    pub fn rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// The amount-to-product matching heuristic: equal within one paisa.
    pub fn matches(&self, other: Amount) -> bool {
        (self.0 - other.0).abs() <= MATCH_TOLERANCE_PAISE
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
