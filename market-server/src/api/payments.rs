//! Payment submission and status endpoints

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use shared::error::AppError;
use shared::request::PaymentRequest;
use shared::response::PaymentView;

use crate::error::ServiceError;
use crate::payments::service;
use crate::state::AppState;

/// POST /api/payments/card — the gateway method id comes from the
/// client-side card SDK along with the token.
pub async fn submit_card(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentView>), ServiceError> {
    let method_id = match request.payment_method_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(AppError::validation("payment_method_id is required for card payments")
                .into());
        }
    };
    let view = service::submit(&state, &method_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/payments/pix
pub async fn submit_pix(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentView>), ServiceError> {
    let view = service::submit(&state, "pix", request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/payments/status/{transaction_id} — local state, no gateway call.
pub async fn status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PaymentView>, ServiceError> {
    let view = service::get_status(&state, &transaction_id).await?;
    Ok(Json(view))
}
