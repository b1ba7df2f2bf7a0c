//! Gateway webhook endpoint
//!
//! 合同：可处理/可忽略 → 200，报文畸形 → 400，验签失败 → 403。
//! 任何状态迁移都发生在验签之后。

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::db;
use crate::payments::gateway::map_status;
use crate::payments::service;
use crate::payments::webhook::{WebhookPayload, parse_payload, verify_signature};
use crate::state::AppState;

/// POST /api/payments/webhook
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. parse the notification body
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&body) else {
        tracing::warn!("Webhook rejected: body is not valid JSON");
        return StatusCode::BAD_REQUEST;
    };
    let data_id = match parse_payload(&payload) {
        Some(WebhookPayload::Payment { data_id }) => data_id,
        Some(WebhookPayload::Ignored) => {
            tracing::debug!("Webhook acknowledged: non-payment topic");
            return StatusCode::OK;
        }
        None => {
            tracing::warn!("Webhook rejected: malformed payment notification");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. verify the signature before touching any state; a missing header
    //    fails exactly like a bad one
    let signature = header_str(&headers, "x-signature");
    let request_id = header_str(&headers, "x-request-id");
    let (Some(signature), Some(request_id)) = (signature, request_id) else {
        tracing::warn!(data_id, "Webhook rejected: missing signature headers");
        return StatusCode::FORBIDDEN;
    };
    if !verify_signature(signature, request_id, &data_id, &state.webhook_secret) {
        tracing::warn!(data_id, "Webhook rejected: signature verification failed");
        return StatusCode::FORBIDDEN;
    }

    // 3. converge the referenced payment
    match process(&state, &data_id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            let app_err: shared::error::AppError = e.into();
            tracing::error!(
                data_id,
                code = %app_err.code,
                message = %app_err.message,
                "Webhook processing failed, gateway will retry"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn process(state: &AppState, data_id: &str) -> crate::error::ServiceResult<()> {
    let Some(row) = db::payments::find_by_transaction_id(&state.pool, data_id).await? else {
        // not ours (or not yet persisted); acknowledge so the gateway
        // stops retrying, the reconciler covers the parked-payment case
        tracing::info!(data_id, "Webhook for unknown payment acknowledged");
        return Ok(());
    };
    let payment = row.into_payment()?;

    // authoritative status comes from the gateway, not the notification
    let gateway_payment = state.gateway.get_payment(data_id).await?;
    let new_status = map_status(&gateway_payment.status);
    service::apply_gateway_status(state, &payment, new_status).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
