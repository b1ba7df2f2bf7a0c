//! Payment table access
//!
//! 幂等键与网关交易号都有唯一约束，插入冲突由调用方通过
//! [`crate::db::is_unique_violation`] 识别并转成业务错误。

use rust_decimal::Decimal;
use shared::models::{Payment, PaymentMethod, PaymentStatus};
use sqlx::PgExecutor;

pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "payments_idempotency_key_key";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub order_id: i64,
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub idempotency_key: String,
    pub payment_date: i64,
}

impl PaymentRow {
    pub fn into_payment(self) -> Result<Payment, sqlx::Error> {
        let method: PaymentMethod = self.method.parse().map_err(|_| {
            sqlx::Error::Decode(format!("unknown payment method '{}'", self.method).into())
        })?;
        let status: PaymentStatus = self.status.parse().map_err(|_| {
            sqlx::Error::Decode(format!("unknown payment status '{}'", self.status).into())
        })?;
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            amount: self.amount,
            method,
            status,
            transaction_id: self.transaction_id,
            idempotency_key: self.idempotency_key,
            payment_date: self.payment_date,
        })
    }
}

pub async fn exists_by_idempotency_key(
    ex: impl PgExecutor<'_>,
    key: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM payments WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(ex)
            .await?;
    Ok(row.is_some())
}

/// Insert a payment record. A unique violation on the idempotency key
/// surfaces as sqlx::Error; check it with `is_unique_violation`.
pub async fn insert(ex: impl PgExecutor<'_>, payment: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments (id, order_id, amount, method, status, transaction_id, idempotency_key, payment_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.transaction_id.as_deref())
    .bind(&payment.idempotency_key)
    .bind(payment.payment_date)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn find_by_transaction_id(
    ex: impl PgExecutor<'_>,
    transaction_id: &str,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT id, order_id, amount, method, status, transaction_id, idempotency_key, payment_date
         FROM payments WHERE transaction_id = $1",
    )
    .bind(transaction_id)
    .fetch_optional(ex)
    .await
}

/// Whether any payment row references the order (blocks order deletion).
pub async fn exists_for_order(
    ex: impl PgExecutor<'_>,
    order_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM payments WHERE order_id = $1 LIMIT 1")
            .bind(order_id)
            .fetch_optional(ex)
            .await?;
    Ok(row.is_some())
}

/// Conditional status update: only fires when the stored status actually
/// differs, so callers learn whether this call was the one that changed it.
pub async fn cas_status(
    ex: impl PgExecutor<'_>,
    id: i64,
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE payments SET status = $3 WHERE id = $1 AND status = $2")
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(ex)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Attach the gateway transaction id once it becomes known (timeout recovery).
pub async fn set_transaction_id(
    ex: impl PgExecutor<'_>,
    id: i64,
    transaction_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET transaction_id = $2 WHERE id = $1 AND transaction_id IS NULL")
        .bind(id)
        .bind(transaction_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// PENDING payments older than the cutoff — the reconciliation sweep set.
pub async fn list_pending_before(
    ex: impl PgExecutor<'_>,
    cutoff_millis: i64,
) -> Result<Vec<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT id, order_id, amount, method, status, transaction_id, idempotency_key, payment_date
         FROM payments WHERE status = 'PENDING' AND payment_date < $1
         ORDER BY payment_date",
    )
    .bind(cutoff_millis)
    .fetch_all(ex)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::snowflake_id;
    use sqlx::PgPool;

    async fn seed_order(pool: &PgPool, order_id: i64) {
        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (1, 'Buyer', 'buyer@example.com', 0)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO orders (id, buyer_id, status, shipping_cost, total, stock_reserved, order_date, updated_at)
             VALUES ($1, 1, 'PENDING', 0, 50.00, TRUE, 0, 0)",
        )
        .bind(order_id)
        .execute(pool)
        .await
        .unwrap();
    }

    fn payment(order_id: i64, key: &str, transaction_id: Option<&str>) -> Payment {
        Payment {
            id: snowflake_id(),
            order_id,
            amount: "50.00".parse().unwrap(),
            method: PaymentMethod::Pix,
            status: PaymentStatus::Pending,
            transaction_id: transaction_id.map(String::from),
            idempotency_key: key.to_string(),
            payment_date: 0,
        }
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL instance via DATABASE_URL"]
    async fn reused_idempotency_key_cannot_create_a_second_row(pool: PgPool) {
        seed_order(&pool, 100).await;
        let key = "22222222-2222-2222-2222-222222222222";

        insert(&pool, &payment(100, key, Some("tx-a"))).await.unwrap();
        let err = insert(&pool, &payment(100, key, Some("tx-b")))
            .await
            .unwrap_err();
        assert!(crate::db::is_unique_violation(&err, IDEMPOTENCY_KEY_CONSTRAINT));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
