//! Cart item table access

use rust_decimal::Decimal;
use shared::models::CartItem;
use sqlx::PgExecutor;

pub async fn list_by_user(
    ex: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Vec<CartItem>, sqlx::Error> {
    let rows: Vec<(i64, i64, i64, i32, Decimal)> = sqlx::query_as(
        "SELECT id, user_id, product_id, quantity, price
         FROM cart_items WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, user_id, product_id, quantity, price)| CartItem {
            id,
            user_id,
            product_id,
            quantity,
            price,
        })
        .collect())
}

/// Remove the user's whole cart (checkout conversion step)
pub async fn delete_by_user(ex: impl PgExecutor<'_>, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}
