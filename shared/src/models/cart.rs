//! Cart item model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cart item — transient pre-order entity
///
/// Exists only until an order is created from it; the full set belonging to
/// a user is atomically converted into order items and removed at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    /// Price snapshot taken when the item was added to the cart
    pub price: Decimal,
}
