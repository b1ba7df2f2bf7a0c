//! Order endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use shared::models::OrderStatus;
use shared::request::{CancelRequest, CheckoutRequest, ShippingUpdateRequest, StatusUpdateRequest};
use shared::response::OrderView;

use crate::error::ServiceError;
use crate::orders::service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<OrderStatus>,
}

/// POST /api/orders — checkout from the user's cart.
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderView>), ServiceError> {
    let order = service::create_from_cart(&state.pool, request.user_id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/orders[?status=] — all orders, optionally filtered by status.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderView>>, ServiceError> {
    let orders = match query.status {
        Some(status) => service::list_by_status(&state.pool, status).await?,
        None => service::list_all(&state.pool).await?,
    };
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ServiceError> {
    let order = service::get_order(&state.pool, id).await?;
    Ok(Json(order.into()))
}

/// GET /api/orders/user/{user_id}
pub async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<OrderView>>, ServiceError> {
    let orders = service::list_by_user(&state.pool, user_id).await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<OrderView>, ServiceError> {
    let order = service::update_status(&state.pool, id, request.status).await?;
    Ok(Json(order.into()))
}

/// PATCH /api/orders/{id}/shipping
pub async fn update_shipping(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ShippingUpdateRequest>,
) -> Result<Json<OrderView>, ServiceError> {
    let order = service::update_shipping_cost(&state.pool, id, request.shipping_cost).await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<OrderView>, ServiceError> {
    let order = service::cancel_order(&state.pool, id, request.user_id).await?;
    Ok(Json(order.into()))
}

/// DELETE /api/orders/{id} — CANCELED orders only.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    service::delete_order(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
