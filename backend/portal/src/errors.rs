//! Application-wide error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("donation {0} has already been processed")]
    AlreadyProcessed(i64),

    #[error("payment declined: {0}")]
    GatewayDeclined(String),

    #[error("invalid or unknown credentials")]
    Unauthenticated,

    #[error("verification could not be committed: {0}")]
    TransactionFailure(String),
}

impl PortalError {
    /// Stable machine-readable kind carried in every failure response.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::AlreadyProcessed(_) => "already_processed",
            Self::GatewayDeclined(_) => "gateway_declined",
            Self::Unauthenticated => "unauthenticated",
            Self::TransactionFailure(_) => "transaction_failure",
            Self::Database(_) | Self::Migrate(_) | Self::Json(_) | Self::Config(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyProcessed(_) => StatusCode::CONFLICT,
            Self::GatewayDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::TransactionFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Migrate(_) | Self::Json(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        // Internal faults are logged with detail but cross the boundary
        // with a generic message.
        let message = match &self {
            Self::Database(_) | Self::Migrate(_) | Self::Json(_) | Self::Config(_) => {
                error!("internal error: {self}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        });

        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(PortalError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(PortalError::NotFound("campaign").kind(), "not_found");
        assert_eq!(PortalError::AlreadyProcessed(7).kind(), "already_processed");
        assert_eq!(
            PortalError::GatewayDeclined("card".into()).kind(),
            "gateway_declined"
        );
        assert_eq!(PortalError::Unauthenticated.kind(), "unauthenticated");
        assert_eq!(
            PortalError::TransactionFailure("busy".into()).kind(),
            "transaction_failure"
        );
    }

    #[test]
    fn statuses_follow_kind() {
        assert_eq!(
            PortalError::AlreadyProcessed(1).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PortalError::TransactionFailure("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PortalError::Unauthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
