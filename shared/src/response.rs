//! Response payloads returned by the HTTP API, plus the relay event shape

use crate::models::{Order, OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order view returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    /// Unix millis
    pub order_date: i64,
    pub items: Vec<OrderItemView>,
}

/// Order line view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
    pub order_item_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            buyer_id: order.buyer_id,
            status: order.status,
            shipping_cost: order.shipping_cost,
            total: order.total,
            order_date: order.order_date,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemView {
                    order_item_id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    subtotal: item.subtotal(),
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }
}

/// Payment view returned after submission or status query
///
/// PIX payments additionally carry the QR code handed back by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentView {
    pub payment_id: i64,
    pub transaction_id: Option<String>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_base64: Option<String>,
}

/// Payment-completed event carried by the event relay
///
/// Consumed at-least-once; the consumer must stay idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentEvent {
    pub order_id: i64,
    pub email: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;

    #[test]
    fn order_view_recomputes_subtotals() {
        let order = Order {
            id: 7,
            buyer_id: 1,
            status: OrderStatus::Pending,
            shipping_cost: "10.00".parse().unwrap(),
            total: "40.00".parse().unwrap(),
            stock_reserved: true,
            order_date: 0,
            items: vec![OrderItem {
                id: 1,
                order_id: 7,
                product_id: 2,
                quantity: 3,
                unit_price: "10.00".parse().unwrap(),
            }],
        };
        let view = OrderView::from(order);
        assert_eq!(view.items[0].subtotal, "30.00".parse().unwrap());
        assert_eq!(view.total, "40.00".parse().unwrap());
    }

    #[test]
    fn payment_event_roundtrips_as_json() {
        let event = PaymentEvent {
            order_id: 42,
            email: "buyer@example.com".into(),
            amount: "99.90".parse().unwrap(),
            status: PaymentStatus::Completed,
            transaction_id: "12345".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: PaymentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
