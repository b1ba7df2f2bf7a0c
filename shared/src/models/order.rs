//! Order model and status state machine
//!
//! 订单状态机是整个订单域的唯一合法变更入口：
//! 所有状态变更先经过 [`OrderStatus::validate_transition`]，
//! 再由编排层执行副作用（扣减/回补库存、发布事件）。

use crate::error::{AppError, ErrorCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status
///
/// Legal transitions:
///
/// | from       | to                          |
/// |------------|-----------------------------|
/// | PENDING    | PAID, PROCESSING, CANCELED  |
/// | PAID       | PROCESSING, CANCELED        |
/// | PROCESSING | SHIPPED, CANCELED           |
/// | SHIPPED    | DELIVERED, CANCELED         |
/// | DELIVERED  | (terminal)                  |
/// | CANCELED   | (terminal)                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }

    /// Whether `self -> target` is a legal transition
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, target) {
            (Pending, Paid) | (Pending, Processing) | (Pending, Canceled) => true,
            (Paid, Processing) | (Paid, Canceled) => true,
            (Processing, Shipped) | (Processing, Canceled) => true,
            (Shipped, Delivered) | (Shipped, Canceled) => true,
            _ => false,
        }
    }

    /// Validate a transition, returning [`ErrorCode::InvalidTransition`] with
    /// `from`/`to` details when illegal. Leaves status decisions to the caller.
    pub fn validate_transition(&self, target: OrderStatus) -> Result<(), AppError> {
        if self.can_transition_to(target) {
            return Ok(());
        }
        let reason = if self.is_terminal() {
            format!("order is {self}, no further transition allowed")
        } else {
            format!("cannot move from {self} to {target}")
        };
        Err(AppError::with_message(ErrorCode::InvalidTransition, reason)
            .with_detail("from", self.as_str())
            .with_detail("to", target.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(format!("Unknown order status: {other}")),
        }
    }
}

/// Order entity
///
/// `total` is always `sum(item.quantity * item.unit_price) + shipping_cost`.
/// Items are immutable once created; prices are frozen snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Buyer reference (non-owning)
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    /// Whether the stock ledger has decremented for this order.
    /// Makes the decrement exactly-once across checkout/webhook/sweeper paths.
    pub stock_reserved: bool,
    /// Creation timestamp (Unix millis)
    pub order_date: i64,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Recompute the invariant total from items + shipping
    pub fn computed_total(&self) -> Decimal {
        items_total(&self.items) + self.shipping_cost
    }
}

/// Order item — frozen snapshot of a cart line at checkout time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    /// Owning order reference (id only, never a live pointer)
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    /// Unit price at time of order, never re-read from the catalog
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of `quantity * unit_price` over a set of items
pub fn items_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::subtotal).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(qty: i32, unit_price: &str) -> OrderItem {
        OrderItem {
            id: 1,
            order_id: 1,
            product_id: 1,
            quantity: qty,
            unit_price: unit_price.parse().unwrap(),
        }
    }

    #[test]
    fn legal_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Canceled));
        assert!(Paid.can_transition_to(Processing));
        assert!(Paid.can_transition_to(Canceled));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Canceled));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Shipped.can_transition_to(Canceled));
    }

    #[test]
    fn skipping_mandatory_states_is_illegal() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Paid.can_transition_to(Delivered));
        assert!(!Paid.can_transition_to(Shipped));
    }

    #[test]
    fn backwards_transitions_are_illegal() {
        use OrderStatus::*;
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use OrderStatus::*;
        for target in [Pending, Paid, Processing, Shipped, Delivered, Canceled] {
            assert!(!Delivered.can_transition_to(target));
            assert!(!Canceled.can_transition_to(target));
        }
    }

    #[test]
    fn validate_transition_reports_from_and_to() {
        let err = OrderStatus::Pending
            .validate_transition(OrderStatus::Delivered)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        let details = err.details.unwrap();
        assert_eq!(details["from"], "PENDING");
        assert_eq!(details["to"], "DELIVERED");
    }

    #[test]
    fn self_transition_is_illegal() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn status_serde_is_screaming_snake() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let back: OrderStatus = serde_json::from_str("\"CANCELED\"").unwrap();
        assert_eq!(back, OrderStatus::Canceled);
    }

    #[test]
    fn total_includes_shipping() {
        let order = Order {
            id: 1,
            buyer_id: 1,
            status: OrderStatus::Pending,
            shipping_cost: dec("15.50"),
            total: dec("215.48"),
            stock_reserved: true,
            order_date: 0,
            items: vec![item(2, "49.99"), item(1, "100.00")],
        };
        assert_eq!(order.computed_total(), dec("215.48"));
        assert_eq!(order.computed_total(), order.total);
    }

    #[test]
    fn items_total_sums_quantity_times_price() {
        let items = vec![item(3, "10.00"), item(2, "0.05")];
        assert_eq!(items_total(&items), dec("30.10"));
    }
}
