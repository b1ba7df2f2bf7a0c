//! Error types and API response structures

use super::codes::ErrorCode;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The primary error type for the marketplace stack, providing:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (field-level errors, context, etc.)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> http::StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error for a named resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{r} not found")).with_detail("resource", r)
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create a gateway error carrying the provider's (sanitized) message
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::GatewayError, msg)
    }
}

/// Serialized error body sent over the wire
///
/// ```json
/// {
///   "code": "E4004",
///   "message": "Illegal order status transition",
///   "details": { "from": "DELIVERED", "to": "PENDING" }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        // 内部错误不暴露细节，完整信息只进运维日志
        let body = if status == http::StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = %self.code, message = %self.message, "Internal error");
            ErrorBody {
                code: self.code.to_string(),
                message: "An internal error occurred".to_string(),
                details: None,
            }
        } else {
            ErrorBody {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_accumulate() {
        let err = AppError::new(ErrorCode::InsufficientStock)
            .with_detail("product", "Keyboard")
            .with_detail("available", 1)
            .with_detail("requested", 2);
        let details = err.details.unwrap();
        assert_eq!(details["product"], "Keyboard");
        assert_eq!(details["available"], 1);
        assert_eq!(details["requested"], 2);
    }

    #[test]
    fn default_message_comes_from_code() {
        let err = AppError::new(ErrorCode::EmptyCart);
        assert_eq!(err.message, "Cart is empty");
    }
}
