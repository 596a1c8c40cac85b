//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tally_core::LedgerError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid caller identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad, missing or contradictory input.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Duplicate write or lost concurrent write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The balance does not cover the operation cost.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Operation cost.
        required: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::InvalidOperation(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_operation",
                msg.clone(),
                None,
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientFunds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidOperation(msg) => Self::InvalidOperation(msg),
            LedgerError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            LedgerError::NotFound(msg) => Self::NotFound(msg),
            LedgerError::AlreadyExists(msg) | LedgerError::Conflict(msg) => Self::Conflict(msg),
            err @ (LedgerError::Decode(_) | LedgerError::Storage(_) | LedgerError::Transport(_)) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn insufficient_funds_carries_details() {
        let (status, body) = body_of(
            LedgerError::InsufficientFunds {
                balance: 2,
                required: 5,
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "insufficient_funds");
        assert_eq!(body["error"]["details"]["balance"], 2);
        assert_eq!(body["error"]["details"]["required"], 5);
    }

    #[tokio::test]
    async fn storage_errors_are_opaque() {
        let (status, body) = body_of(LedgerError::Storage("rocksdb put failed".into()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_codes() {
        let cases = [
            (LedgerError::invalid("bad"), StatusCode::BAD_REQUEST),
            (LedgerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LedgerError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (LedgerError::Conflict("x".into()), StatusCode::CONFLICT),
            (LedgerError::decode("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (LedgerError::Transport("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
