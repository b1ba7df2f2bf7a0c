//! Unified error codes for the marketplace stack
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product / stock errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Payer email does not match the order's buyer
    PayerMismatch = 2002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// User not found
    UserNotFound = 4002,
    /// Cart is empty, nothing to check out
    EmptyCart = 4003,
    /// Illegal order status transition
    InvalidTransition = 4004,
    /// Order total is not strictly positive
    InvalidOrderAmount = 4005,
    /// Order has payment records and cannot be deleted
    OrderHasPayments = 4006,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Idempotency key was already used for a payment
    DuplicateIdempotencyKey = 5002,
    /// Card token missing for a card payment
    CardTokenRequired = 5003,
    /// Payment gateway rejected or failed the request
    GatewayError = 5004,
    /// Payment gateway did not answer within the timeout
    GatewayTimeout = 5005,

    // ==================== 6xxx: Product / Stock ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Not enough stock to satisfy the requested quantity
    InsufficientStock = 6002,
    /// Stock was concurrently modified, retry the operation
    StockConflict = 6003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::NotAuthenticated => "Authentication required",
            Self::PermissionDenied => "Permission denied",
            Self::PayerMismatch => "You are not allowed to pay for this order",
            Self::OrderNotFound => "Order not found",
            Self::UserNotFound => "User not found",
            Self::EmptyCart => "Cart is empty",
            Self::InvalidTransition => "Illegal order status transition",
            Self::InvalidOrderAmount => "Order total must be positive",
            Self::OrderHasPayments => "Order has payment records and cannot be deleted",
            Self::PaymentNotFound => "Payment not found",
            Self::DuplicateIdempotencyKey => "Transaction already processed (idempotency)",
            Self::CardTokenRequired => "Card token is required for this payment method",
            Self::GatewayError => "Payment gateway error",
            Self::GatewayTimeout => "Payment gateway timed out",
            Self::ProductNotFound => "Product not found",
            Self::InsufficientStock => "Insufficient stock",
            Self::StockConflict => "Stock was just modified, refresh and retry",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::AlreadyExists),
            5 => Ok(Self::InvalidRequest),
            1001 => Ok(Self::NotAuthenticated),
            2001 => Ok(Self::PermissionDenied),
            2002 => Ok(Self::PayerMismatch),
            4001 => Ok(Self::OrderNotFound),
            4002 => Ok(Self::UserNotFound),
            4003 => Ok(Self::EmptyCart),
            4004 => Ok(Self::InvalidTransition),
            4005 => Ok(Self::InvalidOrderAmount),
            4006 => Ok(Self::OrderHasPayments),
            5001 => Ok(Self::PaymentNotFound),
            5002 => Ok(Self::DuplicateIdempotencyKey),
            5003 => Ok(Self::CardTokenRequired),
            5004 => Ok(Self::GatewayError),
            5005 => Ok(Self::GatewayTimeout),
            6001 => Ok(Self::ProductNotFound),
            6002 => Ok(Self::InsufficientStock),
            6003 => Ok(Self::StockConflict),
            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::DatabaseError),
            9003 => Ok(Self::ConfigError),
            _ => Err(format!("Unknown error code: {value}")),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", *self as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::EmptyCart,
            ErrorCode::InvalidTransition,
            ErrorCode::OrderHasPayments,
            ErrorCode::DuplicateIdempotencyKey,
            ErrorCode::InsufficientStock,
            ErrorCode::GatewayTimeout,
            ErrorCode::DatabaseError,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw), Ok(code));
        }
    }

    #[test]
    fn display_is_padded() {
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
        assert_eq!(ErrorCode::InsufficientStock.to_string(), "E6002");
    }
}
