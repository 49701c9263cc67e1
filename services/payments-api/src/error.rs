//! Error types for the Payments API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use linkup_payments_core::PaymentsError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid identity")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Payments(#[from] PaymentsError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Payments(e) => match e {
                PaymentsError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentsError::Forbidden(_) => StatusCode::FORBIDDEN,
                PaymentsError::Conflict(_) => StatusCode::CONFLICT,
                PaymentsError::BadRequest(_) | PaymentsError::Webhook(_) => {
                    StatusCode::BAD_REQUEST
                }
                PaymentsError::Provider(_) => StatusCode::BAD_GATEWAY,
                PaymentsError::Database(_) | PaymentsError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Payments(e) => match e {
                PaymentsError::NotFound(_) => "NOT_FOUND",
                PaymentsError::Forbidden(_) => "FORBIDDEN",
                PaymentsError::Conflict(_) => "CONFLICT",
                PaymentsError::BadRequest(_) => "BAD_REQUEST",
                PaymentsError::Webhook(_) => "WEBHOOK_ERROR",
                PaymentsError::Provider(_) => "PAYMENT_PROVIDER_ERROR",
                PaymentsError::Database(_) | PaymentsError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Payments(PaymentsError::Database(_) | PaymentsError::Internal(_))
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Internal details stay in the logs
        let message = if self.is_internal() {
            tracing::error!(error = ?self, "Internal API error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payments_errors_map_to_status() {
        let cases = [
            (PaymentsError::NotFound("event"), StatusCode::NOT_FOUND),
            (PaymentsError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (PaymentsError::Conflict("x".into()), StatusCode::CONFLICT),
            (PaymentsError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (PaymentsError::Provider("x".into()), StatusCode::BAD_GATEWAY),
            (PaymentsError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let response = ApiError::from(PaymentsError::Internal("pool exhausted".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
