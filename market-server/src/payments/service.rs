//! Payment submission pipeline and status convergence
//!
//! 提交、Webhook、对账三条路径都汇聚到 [`apply_gateway_status`]：
//! CAS 更新支付状态，只有真正完成迁移的那次调用才暂存事件并审批订单。
//! 事件与支付状态变更同一事务落库；审批失败由 relay worker 幂等重试。

use shared::error::{AppError, ErrorCode};
use shared::models::{Payment, PaymentStatus};
use shared::request::PaymentRequest;
use shared::response::{PaymentEvent, PaymentView};
use shared::util::{now_millis, snowflake_id};

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::orders;
use crate::payments::gateway::{
    GatewayPayer, GatewayPayment, GatewayPaymentRequest, map_method, map_status,
};
use crate::state::AppState;

/// Submit a payment for an order. `method_id` is the gateway method id
/// ("pix" from the PIX endpoint, the card SDK's id from the card endpoint).
pub async fn submit(
    state: &AppState,
    method_id: &str,
    request: PaymentRequest,
) -> ServiceResult<PaymentView> {
    let idempotency_key = request.idempotency_key.to_string();

    // Fast-path duplicate check; the UNIQUE constraint at insert remains
    // the authoritative guard.
    if db::payments::exists_by_idempotency_key(&state.pool, &idempotency_key).await? {
        return Err(duplicate_key_error().into());
    }

    let order = orders::service::get_order(&state.pool, request.order_id).await?;
    let buyer = db::users::find_by_id(&state.pool, order.buyer_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if !buyer.email.eq_ignore_ascii_case(&request.email) {
        return Err(AppError::with_message(
            ErrorCode::PayerMismatch,
            "Payer email does not match the order's buyer",
        )
        .into());
    }
    if order.total <= rust_decimal::Decimal::ZERO {
        return Err(AppError::new(ErrorCode::InvalidOrderAmount)
            .with_detail("total", order.total.to_string())
            .into());
    }

    let method = map_method(method_id);
    let (token, installments) = card_fields(method, &request).map_err(ServiceError::App)?;

    let gateway_request = GatewayPaymentRequest {
        transaction_amount: order.total,
        description: format!("Order {}", order.id),
        payment_method_id: method_id.to_string(),
        external_reference: order.id.to_string(),
        payer: GatewayPayer {
            email: request.email.clone(),
        },
        token,
        installments,
    };

    match state
        .gateway
        .create_payment(&gateway_request, &idempotency_key)
        .await
    {
        Ok(gateway_payment) => {
            let status = map_status(&gateway_payment.status);
            let payment = Payment {
                id: snowflake_id(),
                order_id: order.id,
                amount: order.total,
                method,
                status,
                transaction_id: Some(gateway_payment.id.to_string()),
                idempotency_key,
                payment_date: now_millis(),
            };

            // The payment row and its event commit as one unit; a crash
            // between them cannot strand a COMPLETED payment without an
            // event to drive the order forward.
            let mut tx = state.pool.begin().await?;
            insert_payment(&mut *tx, &payment).await?;
            if status == PaymentStatus::Completed {
                let event = payment_event(&payment, &buyer.email);
                state.relay.stage(&mut tx, &event).await?;
            }
            tx.commit().await?;

            if status == PaymentStatus::Completed {
                approve_or_defer(state, order.id).await;
            }

            tracing::info!(
                order_id = order.id,
                payment_id = payment.id,
                transaction_id = ?payment.transaction_id,
                status = %status,
                "Payment submitted"
            );
            Ok(view_with_qr(&payment, &gateway_payment))
        }
        Err(err) if err.code == ErrorCode::GatewayTimeout => {
            // The gateway may have created the charge before timing out.
            // Park the payment as PENDING; the reconciliation sweep finds
            // it by external reference and converges it.
            let payment = Payment {
                id: snowflake_id(),
                order_id: order.id,
                amount: order.total,
                method,
                status: PaymentStatus::Pending,
                transaction_id: None,
                idempotency_key,
                payment_date: now_millis(),
            };
            insert_payment(&state.pool, &payment).await?;
            tracing::warn!(
                order_id = order.id,
                payment_id = payment.id,
                "Gateway timed out; payment parked as PENDING for reconciliation"
            );
            Ok(view(&payment))
        }
        Err(err) => Err(err.into()),
    }
}

/// Local status lookup — no gateway round trip.
pub async fn get_status(state: &AppState, transaction_id: &str) -> ServiceResult<PaymentView> {
    let row = db::payments::find_by_transaction_id(&state.pool, transaction_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;
    Ok(view(&row.into_payment()?))
}

/// The single idempotent convergence point shared by the submission path,
/// the webhook handler and the reconciliation sweep.
///
/// CAS-updates the payment status and stages the event in the same
/// transaction; only the call that actually moved the row to COMPLETED
/// produces an event, so repeated notifications stage exactly one. Order
/// approval runs after commit — if it fails transiently, the staged event
/// makes the relay worker retry it with backoff.
pub async fn apply_gateway_status(
    state: &AppState,
    payment: &Payment,
    new_status: PaymentStatus,
) -> ServiceResult<()> {
    if payment.status == new_status {
        return Ok(());
    }

    let mut tx = state.pool.begin().await?;
    let changed =
        db::payments::cas_status(&mut *tx, payment.id, payment.status, new_status).await?;
    if !changed {
        // a concurrent path converged this payment first
        return Ok(());
    }
    if new_status == PaymentStatus::Completed {
        let buyer_email = buyer_email_for_order(state, payment.order_id).await?;
        let completed = Payment {
            status: PaymentStatus::Completed,
            ..payment.clone()
        };
        let event = payment_event(&completed, &buyer_email);
        state.relay.stage(&mut tx, &event).await?;
    }
    tx.commit().await?;

    tracing::info!(
        payment_id = payment.id,
        order_id = payment.order_id,
        from = %payment.status,
        to = %new_status,
        "Payment status converged"
    );

    if new_status == PaymentStatus::Completed {
        approve_or_defer(state, payment.order_id).await;
    }
    Ok(())
}

/// Best-effort immediate approval. The staged event already guarantees
/// convergence: on failure the relay worker retries the idempotent
/// approval with backoff, so this never propagates an error.
async fn approve_or_defer(state: &AppState, order_id: i64) {
    if let Err(e) = orders::service::approve_order(&state.pool, order_id).await {
        let app_err: AppError = e.into();
        tracing::warn!(
            order_id,
            code = %app_err.code,
            message = %app_err.message,
            "Immediate order approval failed; relay worker will retry"
        );
    }
}

fn payment_event(payment: &Payment, buyer_email: &str) -> PaymentEvent {
    PaymentEvent {
        order_id: payment.order_id,
        email: buyer_email.to_string(),
        amount: payment.amount,
        status: payment.status,
        transaction_id: payment.transaction_id.clone().unwrap_or_default(),
    }
}

async fn buyer_email_for_order(state: &AppState, order_id: i64) -> ServiceResult<String> {
    let order = orders::service::get_order(&state.pool, order_id).await?;
    let buyer = db::users::find_by_id(&state.pool, order.buyer_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(buyer.email)
}

async fn insert_payment(ex: impl sqlx::PgExecutor<'_>, payment: &Payment) -> ServiceResult<()> {
    db::payments::insert(ex, payment).await.map_err(|e| {
        if db::is_unique_violation(&e, db::payments::IDEMPOTENCY_KEY_CONSTRAINT) {
            ServiceError::App(duplicate_key_error())
        } else {
            ServiceError::Db(e)
        }
    })
}

/// Card methods require a non-empty token; zero or missing installments
/// default to a single installment. PIX and boleto carry neither field.
fn card_fields(
    method: shared::models::PaymentMethod,
    request: &PaymentRequest,
) -> Result<(Option<String>, Option<i32>), AppError> {
    if !method.requires_card_token() {
        return Ok((None, None));
    }
    let token = match request.token.as_deref() {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => return Err(AppError::new(ErrorCode::CardTokenRequired)),
    };
    let installments = request.installments.filter(|i| *i >= 1).unwrap_or(1);
    Ok((Some(token), Some(installments)))
}

fn duplicate_key_error() -> AppError {
    AppError::with_message(
        ErrorCode::DuplicateIdempotencyKey,
        "A payment with this idempotency key was already submitted",
    )
}

fn view(payment: &Payment) -> PaymentView {
    PaymentView {
        payment_id: payment.id,
        transaction_id: payment.transaction_id.clone(),
        amount: payment.amount,
        status: payment.status,
        qr_code: None,
        qr_code_base64: None,
    }
}

fn view_with_qr(payment: &Payment, gateway_payment: &GatewayPayment) -> PaymentView {
    let transaction_data = gateway_payment
        .point_of_interaction
        .as_ref()
        .and_then(|poi| poi.transaction_data.as_ref());
    PaymentView {
        qr_code: transaction_data.and_then(|t| t.qr_code.clone()),
        qr_code_base64: transaction_data.and_then(|t| t.qr_code_base64.clone()),
        ..view(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentMethod;
    use uuid::Uuid;

    fn request(token: Option<&str>, installments: Option<i32>) -> PaymentRequest {
        PaymentRequest {
            order_id: 1,
            email: "buyer@example.com".into(),
            idempotency_key: Uuid::nil(),
            token: token.map(String::from),
            installments,
            payment_method_id: None,
        }
    }

    #[test]
    fn card_requires_token() {
        let err = card_fields(PaymentMethod::CreditCard, &request(None, Some(3))).unwrap_err();
        assert_eq!(err.code, ErrorCode::CardTokenRequired);

        let err = card_fields(PaymentMethod::DebitCard, &request(Some("  "), None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::CardTokenRequired);
    }

    #[test]
    fn card_installments_default_to_one() {
        let (token, installments) =
            card_fields(PaymentMethod::CreditCard, &request(Some("tok_abc"), None)).unwrap();
        assert_eq!(token.as_deref(), Some("tok_abc"));
        assert_eq!(installments, Some(1));

        let (_, installments) =
            card_fields(PaymentMethod::CreditCard, &request(Some("tok_abc"), Some(0))).unwrap();
        assert_eq!(installments, Some(1));

        let (_, installments) =
            card_fields(PaymentMethod::CreditCard, &request(Some("tok_abc"), Some(6))).unwrap();
        assert_eq!(installments, Some(6));
    }

    #[test]
    fn event_carries_payment_identity() {
        let payment = Payment {
            id: 9,
            order_id: 42,
            amount: "50.00".parse().unwrap(),
            method: PaymentMethod::Pix,
            status: PaymentStatus::Completed,
            transaction_id: Some("777".into()),
            idempotency_key: Uuid::nil().to_string(),
            payment_date: 0,
        };
        let event = payment_event(&payment, "buyer@example.com");
        assert_eq!(event.order_id, 42);
        assert_eq!(event.email, "buyer@example.com");
        assert_eq!(event.status, PaymentStatus::Completed);
        assert_eq!(event.transaction_id, "777");
    }

    #[test]
    fn pix_and_boleto_need_no_card_fields() {
        for method in [PaymentMethod::Pix, PaymentMethod::BankTransfer] {
            let (token, installments) = card_fields(method, &request(None, None)).unwrap();
            assert_eq!(token, None);
            assert_eq!(installments, None);
        }
    }
}
