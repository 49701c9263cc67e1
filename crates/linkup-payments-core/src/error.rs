//! Payments errors

use thiserror::Error;

/// Payments errors
#[derive(Error, Debug)]
pub enum PaymentsError {
    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requester may not perform the operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An equivalent record already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Payment provider error
    #[error("provider error: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("webhook error: {0}")]
    Webhook(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] linkup_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaymentsError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a provider error
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    /// Check if this is a webhook signature failure
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, Self::Webhook(_))
    }
}

/// Result alias for payments operations
pub type PaymentsResult<T> = Result<T, PaymentsError>;
