//! Payment-event outbox table access
//!
//! 事件与业务写入同一事务落库，消费进度用 attempts / next_attempt_at /
//! delivered_at 三个字段推进，超出重试预算进入死信。

use rust_decimal::Decimal;
use shared::models::PaymentStatus;
use shared::response::PaymentEvent;
use sqlx::PgExecutor;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRow {
    pub id: i64,
    pub order_id: i64,
    pub buyer_email: String,
    pub amount: Decimal,
    pub status: String,
    pub transaction_id: String,
    pub attempts: i32,
}

impl OutboxRow {
    pub fn into_event(self) -> Result<PaymentEvent, sqlx::Error> {
        let status: PaymentStatus = self.status.parse().map_err(|_| {
            sqlx::Error::Decode(format!("unknown payment status '{}'", self.status).into())
        })?;
        Ok(PaymentEvent {
            order_id: self.order_id,
            email: self.buyer_email,
            amount: self.amount,
            status,
            transaction_id: self.transaction_id,
        })
    }
}

/// Append an event. Meant to run inside the same transaction as the state
/// change that produced it.
pub async fn enqueue(
    ex: impl PgExecutor<'_>,
    id: i64,
    event: &PaymentEvent,
    now_millis: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payment_outbox (id, order_id, buyer_email, amount, status, transaction_id, next_attempt_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
    )
    .bind(id)
    .bind(event.order_id)
    .bind(&event.email)
    .bind(event.amount)
    .bind(event.status.as_str())
    .bind(&event.transaction_id)
    .bind(now_millis)
    .execute(ex)
    .await?;
    Ok(())
}

/// Undelivered, non-dead rows whose next attempt is due.
pub async fn fetch_due(
    ex: impl PgExecutor<'_>,
    now_millis: i64,
    limit: i64,
) -> Result<Vec<OutboxRow>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRow>(
        "SELECT id, order_id, buyer_email, amount, status, transaction_id, attempts
         FROM payment_outbox
         WHERE delivered_at IS NULL AND dead_lettered_at IS NULL AND next_attempt_at <= $1
         ORDER BY next_attempt_at
         LIMIT $2",
    )
    .bind(now_millis)
    .bind(limit)
    .fetch_all(ex)
    .await
}

pub async fn mark_delivered(
    ex: impl PgExecutor<'_>,
    id: i64,
    now_millis: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payment_outbox SET delivered_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now_millis)
        .execute(ex)
        .await?;
    Ok(())
}

/// Record a failed attempt and schedule the next one.
pub async fn mark_failed(
    ex: impl PgExecutor<'_>,
    id: i64,
    next_attempt_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_outbox SET attempts = attempts + 1, next_attempt_at = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(next_attempt_at)
    .execute(ex)
    .await?;
    Ok(())
}

/// Take the row out of rotation after exhausting the attempt budget.
pub async fn dead_letter(
    ex: impl PgExecutor<'_>,
    id: i64,
    now_millis: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payment_outbox SET attempts = attempts + 1, dead_lettered_at = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(now_millis)
    .execute(ex)
    .await?;
    Ok(())
}
