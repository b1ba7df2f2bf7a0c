//! Request payloads accepted by the HTTP API

use crate::models::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkout: turn the user's cart into an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: i64,
}

/// PATCH an order's status (state-machine guarded)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Update shipping cost on a PENDING order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingUpdateRequest {
    pub shipping_cost: Decimal,
}

/// Cancel an order on behalf of its buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub user_id: i64,
}

/// Payment submission
///
/// `idempotency_key` is mandatory: a retried request with the same key must
/// not create a second charge. `token`/`installments`/`payment_method_id`
/// are required for card methods only (the method id comes from the
/// client-side card SDK, e.g. "visa" or "debit_card"); the PIX endpoint
/// ignores all three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: i64,
    pub email: String,
    pub idempotency_key: Uuid,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub installments: Option<i32>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
}
