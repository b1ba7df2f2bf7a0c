//! Order orchestrator
//!
//! 从购物车下单到取消/删除的全部用例。每个用例一个事务；
//! 库存扣减只发生一次，由 `orders.stock_reserved` 标记守卫。

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderItem, OrderStatus, items_total};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::orders::stock::{self, StockDemand};

/// Checkout: convert the user's cart into a PENDING order.
///
/// One transaction covers validation, order insert, stock decrement and
/// cart deletion; any failure leaves everything untouched.
pub async fn create_from_cart(pool: &PgPool, user_id: i64) -> ServiceResult<Order> {
    let user = db::users::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let mut tx = pool.begin().await?;

    let cart = db::cart::list_by_user(&mut *tx, user_id).await?;
    if cart.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyCart).into());
    }

    let product_ids: Vec<i64> = cart.iter().map(|c| c.product_id).collect();
    let products = db::products::find_by_ids(&mut *tx, &product_ids).await?;

    // Pure validation pass before any write
    let mut demands = Vec::with_capacity(cart.len());
    for line in &cart {
        let product = products
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ProductNotFound)
                    .with_detail("product_id", line.product_id)
            })?;
        demands.push(StockDemand {
            product_id: product.id,
            product_name: &product.name,
            available: product.stock_quantity,
            requested: line.quantity,
        });
    }
    stock::validate_availability(&demands).map_err(ServiceError::App)?;

    let order_id = snowflake_id();
    let now = now_millis();
    let items: Vec<OrderItem> = cart
        .iter()
        .map(|line| {
            // frozen price snapshot: current catalog price, not the cart's
            let unit_price = products
                .iter()
                .find(|p| p.id == line.product_id)
                .map(|p| p.price)
                .unwrap_or(line.price);
            OrderItem {
                id: snowflake_id(),
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            }
        })
        .collect();

    let order = Order {
        id: order_id,
        buyer_id: user.id,
        status: OrderStatus::Pending,
        shipping_cost: Decimal::ZERO,
        total: items_total(&items),
        stock_reserved: true,
        order_date: now,
        items,
    };

    db::orders::insert(&mut tx, &order).await?;
    stock::decrement_for_items(&mut tx, &order.items).await?;
    db::cart::delete_by_user(&mut *tx, user_id).await?;

    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        buyer_id = order.buyer_id,
        total = %order.total,
        items = order.items.len(),
        "Order created from cart"
    );
    Ok(order)
}

pub async fn get_order(pool: &PgPool, order_id: i64) -> ServiceResult<Order> {
    db::orders::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).into())
}

pub async fn list_all(pool: &PgPool) -> ServiceResult<Vec<Order>> {
    Ok(db::orders::list_all(pool).await?)
}

pub async fn list_by_user(pool: &PgPool, user_id: i64) -> ServiceResult<Vec<Order>> {
    Ok(db::orders::list_by_buyer(pool, user_id).await?)
}

pub async fn list_by_status(pool: &PgPool, status: OrderStatus) -> ServiceResult<Vec<Order>> {
    Ok(db::orders::list_by_status(pool, status).await?)
}

/// Drive the order to `target`, applying side effects for CANCELED.
pub async fn update_status(
    pool: &PgPool,
    order_id: i64,
    target: OrderStatus,
) -> ServiceResult<Order> {
    let order = get_order(pool, order_id).await?;
    order.status.validate_transition(target)?;

    if target == OrderStatus::Canceled {
        cancel_with_restock(pool, &order).await?;
    } else {
        let changed =
            db::orders::cas_status(pool, order_id, order.status, target, now_millis()).await?;
        if !changed {
            // concurrent writer moved the order first
            return Err(stale_transition(order.status, target).into());
        }
    }

    tracing::info!(order_id, from = %order.status, to = %target, "Order status updated");
    get_order(pool, order_id).await
}

/// Buyer-initiated cancellation with ownership check.
pub async fn cancel_order(pool: &PgPool, order_id: i64, user_id: i64) -> ServiceResult<Order> {
    let order = get_order(pool, order_id).await?;
    if order.buyer_id != user_id {
        return Err(AppError::permission_denied("Order belongs to another user").into());
    }
    order.status.validate_transition(OrderStatus::Canceled)?;
    cancel_with_restock(pool, &order).await?;
    tracing::info!(order_id, user_id, "Order cancelled by buyer");
    get_order(pool, order_id).await
}

/// Only CANCELED orders may be deleted, and only while no payment row
/// references them — payment records are the financial audit trail.
pub async fn delete_order(pool: &PgPool, order_id: i64) -> ServiceResult<()> {
    let order = get_order(pool, order_id).await?;
    if order.status != OrderStatus::Canceled {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "Only CANCELED orders can be deleted",
        )
        .with_detail("status", order.status.as_str())
        .into());
    }
    if db::payments::exists_for_order(pool, order_id).await? {
        return Err(has_payments_error(order_id).into());
    }
    // the pre-check can race a concurrent submission; the FK constraint
    // catches that and gets the same client error
    db::orders::delete_canceled(pool, order_id)
        .await
        .map_err(|e| {
            if db::is_foreign_key_violation(&e) {
                ServiceError::App(has_payments_error(order_id))
            } else {
                ServiceError::Db(e)
            }
        })?;
    tracing::info!(order_id, "Canceled order deleted");
    Ok(())
}

fn has_payments_error(order_id: i64) -> AppError {
    AppError::new(ErrorCode::OrderHasPayments).with_detail("order_id", order_id)
}

/// Idempotent payment approval: PAID already is a no-op; otherwise CAS to
/// PAID and make sure the stock decrement has happened exactly once.
pub async fn approve_order(pool: &PgPool, order_id: i64) -> ServiceResult<()> {
    let order = get_order(pool, order_id).await?;
    if order.status == OrderStatus::Paid {
        return Ok(());
    }
    order.status.validate_transition(OrderStatus::Paid)?;

    let mut tx = pool.begin().await?;
    let changed =
        db::orders::cas_status(&mut *tx, order_id, order.status, OrderStatus::Paid, now_millis())
            .await?;
    if !changed {
        // lost the race; the winner already did the work
        return Ok(());
    }
    // checkout normally reserves stock already; this only fires when it
    // didn't, keeping the decrement exactly-once
    let newly_reserved = db::orders::set_stock_reserved(&mut *tx, order_id, true).await?;
    if newly_reserved {
        stock::decrement_for_items(&mut tx, &order.items).await?;
    }
    tx.commit().await?;

    tracing::info!(order_id, "Order approved (PAID)");
    Ok(())
}

/// Shipping cost can only change while the order is still PENDING; the
/// total is recomputed from the frozen item prices.
pub async fn update_shipping_cost(
    pool: &PgPool,
    order_id: i64,
    shipping_cost: Decimal,
) -> ServiceResult<Order> {
    if shipping_cost < Decimal::ZERO {
        return Err(AppError::validation("Shipping cost cannot be negative").into());
    }
    let order = get_order(pool, order_id).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::with_message(
            ErrorCode::InvalidTransition,
            "Shipping cost can only change while the order is PENDING",
        )
        .with_detail("status", order.status.as_str())
        .into());
    }

    let total = items_total(&order.items) + shipping_cost;
    let updated =
        db::orders::update_shipping(pool, order_id, shipping_cost, total, now_millis()).await?;
    if !updated {
        return Err(stale_transition(order.status, order.status).into());
    }
    get_order(pool, order_id).await
}

/// Transition to CANCELED and restock exactly once. The `stock_reserved`
/// flag flip and the restock share one transaction, so a crash cannot
/// restock twice.
async fn cancel_with_restock(pool: &PgPool, order: &Order) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let changed = db::orders::cas_status(
        &mut *tx,
        order.id,
        order.status,
        OrderStatus::Canceled,
        now_millis(),
    )
    .await?;
    if !changed {
        return Err(stale_transition(order.status, OrderStatus::Canceled).into());
    }
    let was_reserved = db::orders::set_stock_reserved(&mut *tx, order.id, false).await?;
    if was_reserved {
        stock::restock_for_items(&mut tx, &order.items).await?;
    }
    tx.commit().await?;
    Ok(())
}

fn stale_transition(from: OrderStatus, to: OrderStatus) -> AppError {
    AppError::with_message(
        ErrorCode::InvalidTransition,
        "Order was modified concurrently, please retry",
    )
    .with_detail("from", from.as_str())
    .with_detail("to", to.as_str())
}

// Stateful invariants need a real database; run with
// `cargo test -- --ignored` against a PostgreSQL pointed to by DATABASE_URL
// (sqlx::test creates a throwaway database per test and applies migrations).
#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Payment, PaymentMethod, PaymentStatus};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn app_code(err: ServiceError) -> ErrorCode {
        match err {
            ServiceError::App(e) => e.code,
            ServiceError::Db(e) => panic!("unexpected database error: {e}"),
        }
    }

    async fn seed_user(pool: &PgPool, id: i64) {
        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES ($1, 'Buyer', $2, 0)")
            .bind(id)
            .bind(format!("buyer{id}@example.com"))
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_product(pool: &PgPool, id: i64, stock: i32) {
        sqlx::query(
            "INSERT INTO products (id, name, price, stock_quantity) VALUES ($1, 'Widget', $2, $3)",
        )
        .bind(id)
        .bind(dec("25.00"))
        .bind(stock)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_cart_item(pool: &PgPool, user_id: i64, product_id: i64, quantity: i32) {
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, price)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(snowflake_id())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(dec("25.00"))
        .execute(pool)
        .await
        .unwrap();
    }

    async fn stock_of(pool: &PgPool, product_id: i64) -> i32 {
        sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL instance via DATABASE_URL"]
    async fn checkout_reserves_stock_and_clears_cart(pool: PgPool) {
        seed_user(&pool, 1).await;
        seed_product(&pool, 10, 5).await;
        seed_cart_item(&pool, 1, 10, 2).await;

        let order = create_from_cart(&pool, 1).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.stock_reserved);
        assert_eq!(order.total, dec("50.00"));
        assert_eq!(stock_of(&pool, 10).await, 3);

        let cart = db::cart::list_by_user(&pool, 1).await.unwrap();
        assert!(cart.is_empty());
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL instance via DATABASE_URL"]
    async fn approve_twice_decrements_stock_once(pool: PgPool) {
        seed_user(&pool, 1).await;
        seed_product(&pool, 10, 5).await;

        // order created without a reservation, so approval must decrement
        let order_id = snowflake_id();
        let order = Order {
            id: order_id,
            buyer_id: 1,
            status: OrderStatus::Pending,
            shipping_cost: Decimal::ZERO,
            total: dec("50.00"),
            stock_reserved: false,
            order_date: 0,
            items: vec![OrderItem {
                id: snowflake_id(),
                order_id,
                product_id: 10,
                quantity: 2,
                unit_price: dec("25.00"),
            }],
        };
        let mut tx = pool.begin().await.unwrap();
        db::orders::insert(&mut tx, &order).await.unwrap();
        tx.commit().await.unwrap();

        approve_order(&pool, order_id).await.unwrap();
        approve_order(&pool, order_id).await.unwrap();

        assert_eq!(stock_of(&pool, 10).await, 3, "decrement must apply once");
        let reloaded = get_order(&pool, order_id).await.unwrap();
        assert_eq!(reloaded.status, OrderStatus::Paid);
        assert!(reloaded.stock_reserved);
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL instance via DATABASE_URL"]
    async fn cancel_twice_restocks_once(pool: PgPool) {
        seed_user(&pool, 1).await;
        seed_product(&pool, 10, 5).await;
        seed_cart_item(&pool, 1, 10, 2).await;

        let order = create_from_cart(&pool, 1).await.unwrap();
        assert_eq!(stock_of(&pool, 10).await, 3);

        let canceled = cancel_order(&pool, order.id, 1).await.unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert_eq!(stock_of(&pool, 10).await, 5);

        let err = cancel_order(&pool, order.id, 1).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::InvalidTransition);
        assert_eq!(stock_of(&pool, 10).await, 5, "second cancel must not restock");
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL instance via DATABASE_URL"]
    async fn canceled_order_with_payments_cannot_be_deleted(pool: PgPool) {
        seed_user(&pool, 1).await;
        seed_product(&pool, 10, 5).await;
        seed_cart_item(&pool, 1, 10, 2).await;

        let order = create_from_cart(&pool, 1).await.unwrap();
        cancel_order(&pool, order.id, 1).await.unwrap();

        let payment = Payment {
            id: snowflake_id(),
            order_id: order.id,
            amount: dec("50.00"),
            method: PaymentMethod::Pix,
            status: PaymentStatus::Failed,
            transaction_id: Some("tx-1".into()),
            idempotency_key: "11111111-1111-1111-1111-111111111111".into(),
            payment_date: 0,
        };
        db::payments::insert(&pool, &payment).await.unwrap();

        let err = delete_order(&pool, order.id).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::OrderHasPayments);
        assert!(get_order(&pool, order.id).await.is_ok(), "order must survive");
    }
}
