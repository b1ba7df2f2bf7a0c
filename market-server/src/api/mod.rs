//! HTTP API
//!
//! 路由统一在这里装配；处理器只做参数提取和视图转换，
//! 业务规则全部在 service 层。

mod health;
mod orders;
mod payments;
mod webhook;

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/orders", post(orders::checkout).get(orders::list))
        .route(
            "/orders/{id}",
            get(orders::get_by_id).delete(orders::delete),
        )
        .route("/orders/user/{user_id}", get(orders::list_by_user))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/shipping", patch(orders::update_shipping))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/payments/card", post(payments::submit_card))
        .route("/payments/pix", post(payments::submit_pix))
        .route("/payments/status/{transaction_id}", get(payments::status))
        .route("/payments/webhook", post(webhook::handle));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
