//! Order and order-item table access
//!
//! 状态变更全部走 [`cas_status`] 条件更新，保证并发下只有一个调用者
//! 能完成同一次迁移。

use rust_decimal::Decimal;
use shared::models::{Order, OrderItem, OrderStatus};
use sqlx::{PgExecutor, Postgres, Transaction};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub buyer_id: i64,
    pub status: String,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub stock_reserved: bool,
    pub order_date: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderRow {
    /// Combine the row with its items into the domain model.
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, sqlx::Error> {
        let status: OrderStatus = self.status.parse().map_err(|_| {
            sqlx::Error::Decode(format!("unknown order status '{}'", self.status).into())
        })?;
        Ok(Order {
            id: self.id,
            buyer_id: self.buyer_id,
            status,
            shipping_cost: self.shipping_cost,
            total: self.total,
            stock_reserved: self.stock_reserved,
            order_date: self.order_date,
            items: items.into_iter().map(OrderItemRow::into_item).collect(),
        })
    }
}

impl OrderItemRow {
    pub fn into_item(self) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Insert an order together with its items inside the caller's transaction.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders (id, buyer_id, status, shipping_cost, total, stock_reserved, order_date, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
    )
    .bind(order.id)
    .bind(order.buyer_id)
    .bind(order.status.as_str())
    .bind(order.shipping_cost)
    .bind(order.total)
    .bind(order.stock_reserved)
    .bind(order.order_date)
    .execute(&mut **tx)
    .await?;

    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn find_row(
    ex: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT id, buyer_id, status, shipping_cost, total, stock_reserved, order_date
         FROM orders WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(ex)
    .await
}

pub async fn list_items(
    ex: impl PgExecutor<'_>,
    order_id: i64,
) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, quantity, unit_price
         FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(ex)
    .await
}

/// Load a full order (row + items) from the pool.
pub async fn find_by_id(
    pool: &sqlx::PgPool,
    id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    let Some(row) = find_row(pool, id).await? else {
        return Ok(None);
    };
    let items = list_items(pool, id).await?;
    Ok(Some(row.into_order(items)?))
}

pub async fn list_all(pool: &sqlx::PgPool) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, buyer_id, status, shipping_cost, total, stock_reserved, order_date
         FROM orders ORDER BY order_date DESC",
    )
    .fetch_all(pool)
    .await?;
    attach_items(pool, rows).await
}

pub async fn list_by_buyer(pool: &sqlx::PgPool, buyer_id: i64) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, buyer_id, status, shipping_cost, total, stock_reserved, order_date
         FROM orders WHERE buyer_id = $1 ORDER BY order_date DESC",
    )
    .bind(buyer_id)
    .fetch_all(pool)
    .await?;
    attach_items(pool, rows).await
}

pub async fn list_by_status(
    pool: &sqlx::PgPool,
    status: OrderStatus,
) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, buyer_id, status, shipping_cost, total, stock_reserved, order_date
         FROM orders WHERE status = $1 ORDER BY order_date DESC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;
    attach_items(pool, rows).await
}

async fn attach_items(
    pool: &sqlx::PgPool,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, sqlx::Error> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, quantity, unit_price
         FROM order_items WHERE order_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = item_rows
            .iter()
            .filter(|i| i.order_id == row.id)
            .cloned()
            .collect();
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

/// Compare-and-set status transition. Returns `false` when the order was no
/// longer in `from` — a concurrent writer got there first.
pub async fn cas_status(
    ex: impl PgExecutor<'_>,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    now_millis: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(now_millis)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Flip the stock-reservation flag, returning whether this call changed it.
/// Used to guarantee exactly-once stock movement per order.
pub async fn set_stock_reserved(
    ex: impl PgExecutor<'_>,
    id: i64,
    reserved: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET stock_reserved = $2 WHERE id = $1 AND stock_reserved = NOT $2",
    )
    .bind(id)
    .bind(reserved)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Update shipping cost and the recomputed total, only while still PENDING.
pub async fn update_shipping(
    ex: impl PgExecutor<'_>,
    id: i64,
    shipping_cost: Decimal,
    total: Decimal,
    now_millis: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET shipping_cost = $2, total = $3, updated_at = $4
         WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(id)
    .bind(shipping_cost)
    .bind(total)
    .bind(now_millis)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Delete a canceled order; items go with it via ON DELETE CASCADE.
pub async fn delete_canceled(ex: impl PgExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND status = 'CANCELED'")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() == 1)
}
