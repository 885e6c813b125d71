use axum::http::StatusCode;

use super::repository::RepositoryError;
use super::subscription::CheckoutError;
use super::visibility::TransitionError;

/// Failure returned by every marketplace operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("insufficient credits")]
    InsufficientCredits,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("temporarily unavailable: {0}")]
    Transient(String),
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
            MarketplaceError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            MarketplaceError::Unauthorized(_) => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        MarketplaceError::Validation(message.into())
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        MarketplaceError::Unauthorized(message.into())
    }
}

impl From<RepositoryError> for MarketplaceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => {
                MarketplaceError::Conflict("record already exists".to_string())
            }
            RepositoryError::NotFound => MarketplaceError::NotFound("record".to_string()),
            RepositoryError::Unavailable(reason) => MarketplaceError::Transient(reason),
        }
    }
}

impl From<TransitionError> for MarketplaceError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::IncompleteProfile { .. } | TransitionError::MissingReason => {
                MarketplaceError::Validation(error.to_string())
            }
            TransitionError::InvalidTransition { .. } => {
                MarketplaceError::Conflict(error.to_string())
            }
        }
    }
}

impl From<CheckoutError> for MarketplaceError {
    fn from(error: CheckoutError) -> Self {
        MarketplaceError::Transient(error.to_string())
    }
}
