use thiserror::Error;
use uuid::Uuid;

use super::payment::PaymentStatus;

/// Rejections raised by domain constructors and the payment state machine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("invalid status transition: {from} → {to}")]
    Transition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// Failures of the backing store. The query layer never interprets these;
/// policy above decides whether they are fatal for the call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row no longer parses into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The verification engine's failure taxonomy. Every variant carries enough
/// raw state to be self-diagnosing from the returned value alone; there is
/// no separate observability channel for these calls.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("no payment records found for this email")]
    NoPaymentsFound,

    #[error("payments exist but none are completed or recoverable")]
    NoValidPayments {
        total: usize,
        pending: usize,
        failed: usize,
        statuses: Vec<PaymentStatus>,
    },

    #[error("no active products are configured")]
    NoProductsConfigured,

    #[error("no active product matches the paid amount")]
    NoMatchingProduct {
        amount_paise: i64,
        product_count: usize,
    },

    #[error("failed to write access grant: {source}")]
    AccessGrantFailed {
        payment_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for VerifyError {
    fn from(err: DomainError) -> Self {
        VerifyError::InvalidParameters(err.to_string())
    }
}
