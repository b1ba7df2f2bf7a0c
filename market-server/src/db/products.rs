//! Product table access — the stock ledger's storage operations
//!
//! 库存只通过这里的条件扣减/回补变更，业务代码不得直接赋值。

use rust_decimal::Decimal;
use shared::models::Product;
use sqlx::PgExecutor;

type ProductTuple = (i64, String, Decimal, i32, Option<String>, bool);

fn from_tuple((id, name, price, stock_quantity, image, is_active): ProductTuple) -> Product {
    Product {
        id,
        name,
        price,
        stock_quantity,
        image,
        is_active,
    }
}

pub async fn find_by_id(ex: impl PgExecutor<'_>, id: i64) -> Result<Option<Product>, sqlx::Error> {
    let row: Option<ProductTuple> = sqlx::query_as(
        "SELECT id, name, price, stock_quantity, image, is_active FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(row.map(from_tuple))
}

/// Load a set of products in one round trip (checkout validation pass)
pub async fn find_by_ids(
    ex: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<Product>, sqlx::Error> {
    let rows: Vec<ProductTuple> = sqlx::query_as(
        "SELECT id, name, price, stock_quantity, image, is_active FROM products WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(ex)
    .await?;
    Ok(rows.into_iter().map(from_tuple).collect())
}

/// Atomic conditional decrement: succeeds only when enough stock remains.
///
/// Returns `false` when the condition failed (concurrent checkout won the
/// race) — the caller must abort its transaction, nothing was changed.
pub async fn try_decrement_stock(
    ex: impl PgExecutor<'_>,
    product_id: i64,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity - $2
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Compensating restock (order cancellation)
pub async fn restock(
    ex: impl PgExecutor<'_>,
    product_id: i64,
    quantity: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2 WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(ex)
        .await?;
    Ok(())
}
