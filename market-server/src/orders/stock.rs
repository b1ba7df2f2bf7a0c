//! Stock ledger operations
//!
//! Validation is pure and runs before any write; the actual movement is an
//! atomic conditional UPDATE per product, so two concurrent checkouts can
//! never drive stock below zero even if both pass validation.

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderItem;
use sqlx::{Postgres, Transaction};

use crate::db;
use crate::error::{ServiceError, ServiceResult};

/// A requested line against the current ledger snapshot.
pub struct StockDemand<'a> {
    pub product_id: i64,
    pub product_name: &'a str,
    pub available: i32,
    pub requested: i32,
}

/// All-or-nothing availability check. The first shortfall fails the whole
/// request; nothing has been written at this point.
pub fn validate_availability(demands: &[StockDemand<'_>]) -> Result<(), AppError> {
    for demand in demands {
        if demand.requested > demand.available {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("product_id", json!(demand.product_id))
                .with_detail("product_name", json!(demand.product_name))
                .with_detail("available", json!(demand.available))
                .with_detail("requested", json!(demand.requested)));
        }
    }
    Ok(())
}

/// Apply the decrement for every order item inside the caller's transaction.
/// A lost race (conditional UPDATE matched nothing) aborts with a retryable
/// StockConflict; the transaction rolls back untouched.
pub async fn decrement_for_items(
    tx: &mut Transaction<'_, Postgres>,
    items: &[OrderItem],
) -> ServiceResult<()> {
    for item in items {
        let decremented =
            db::products::try_decrement_stock(&mut **tx, item.product_id, item.quantity).await?;
        if !decremented {
            return Err(ServiceError::App(
                AppError::new(ErrorCode::StockConflict)
                    .with_detail("product_id", json!(item.product_id))
                    .with_detail("requested", json!(item.quantity)),
            ));
        }
    }
    Ok(())
}

/// Compensating restock for a cancelled order's items.
pub async fn restock_for_items(
    tx: &mut Transaction<'_, Postgres>,
    items: &[OrderItem],
) -> ServiceResult<()> {
    for item in items {
        db::products::restock(&mut **tx, item.product_id, item.quantity).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(id: i64, name: &str, available: i32, requested: i32) -> StockDemand<'_> {
        StockDemand {
            product_id: id,
            product_name: name,
            available,
            requested,
        }
    }

    #[test]
    fn all_lines_available_passes() {
        let demands = [demand(1, "alpha", 5, 3), demand(2, "beta", 2, 2)];
        assert!(validate_availability(&demands).is_ok());
    }

    #[test]
    fn one_shortfall_fails_whole_request() {
        // alpha alone would fit, beta is short by one
        let demands = [demand(1, "alpha", 5, 3), demand(2, "beta", 1, 2)];
        let err = validate_availability(&demands).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details["product_id"], serde_json::json!(2));
        assert_eq!(details["available"], serde_json::json!(1));
        assert_eq!(details["requested"], serde_json::json!(2));
    }

    #[test]
    fn exact_stock_is_enough() {
        let demands = [demand(1, "alpha", 3, 3)];
        assert!(validate_availability(&demands).is_ok());
    }
}
