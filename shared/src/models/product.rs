//! Product model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock_quantity` is mutated only through the stock ledger's
/// decrement/restock operations, never by direct assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    /// Available quantity, >= 0 at all times (CHECK constraint in storage)
    pub stock_quantity: i32,
    pub image: Option<String>,
    pub is_active: bool,
}
