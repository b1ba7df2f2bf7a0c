//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::UserNotFound
            | Self::PaymentNotFound
            | Self::ProductNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (transient for stock, permanent for idempotency
            // reuse and payment-bearing orders)
            Self::AlreadyExists
            | Self::DuplicateIdempotencyKey
            | Self::StockConflict
            | Self::OrderHasPayments => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied | Self::PayerMismatch => StatusCode::FORBIDDEN,

            // 503 Service Unavailable (transient, client can retry)
            Self::GatewayTimeout => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation/business errors,
            // including sanitized gateway rejections)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_matches_boundary_contract() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EmptyCart.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InsufficientStock.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidTransition.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::PayerMismatch.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::DuplicateIdempotencyKey.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::StockConflict.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::OrderHasPayments.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::GatewayError.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
