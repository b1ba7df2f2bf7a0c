//! Payment gateway HTTP client (MercadoPago-style REST API)
//!
//! Every call carries Bearer auth and a bounded timeout. Provider statuses
//! and method ids are mapped into the closed local enums here; the rest of
//! the codebase never sees a raw gateway string.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{PaymentMethod, PaymentStatus};

/// Outgoing payment creation body
#[derive(Debug, Serialize)]
pub struct GatewayPaymentRequest {
    pub transaction_amount: Decimal,
    pub description: String,
    pub payment_method_id: String,
    /// Order id, used to find the payment again when the response was lost
    pub external_reference: String,
    pub payer: GatewayPayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct GatewayPayer {
    pub email: String,
}

/// Gateway payment resource (the fields we consume)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointOfInteraction {
    #[serde(default)]
    pub transaction_data: Option<TransactionData>,
}

/// PIX QR code data
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<GatewayPayment>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the payment gateway
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GatewayClient {
    pub fn new(
        base_url: String,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            access_token,
        })
    }

    /// POST /v1/payments with the caller's idempotency key as a header —
    /// the gateway deduplicates retried submissions on its side too.
    pub async fn create_payment(
        &self,
        request: &GatewayPaymentRequest,
        idempotency_key: &str,
    ) -> Result<GatewayPayment, AppError> {
        let url = format!("{}/v1/payments", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;
        parse_payment(response).await
    }

    /// GET /v1/payments/{id}
    pub async fn get_payment(&self, transaction_id: &str) -> Result<GatewayPayment, AppError> {
        let url = format!("{}/v1/payments/{}", self.base_url, transaction_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(classify_transport_error)?;
        parse_payment(response).await
    }

    /// Look a payment up by our order id. Used to recover submissions whose
    /// response was lost before a transaction id was known.
    pub async fn search_by_reference(
        &self,
        order_id: i64,
    ) -> Result<Option<GatewayPayment>, AppError> {
        let url = format!(
            "{}/v1/payments/search?external_reference={}",
            self.base_url, order_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(classify_transport_error)?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::gateway(format!("Malformed gateway response: {e}")))?;
        Ok(body.results.into_iter().next())
    }
}

async fn parse_payment(response: reqwest::Response) -> Result<GatewayPayment, AppError> {
    if !response.status().is_success() {
        return Err(provider_error(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| AppError::gateway(format!("Malformed gateway response: {e}")))
}

async fn provider_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let message = response
        .json::<GatewayErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("Gateway returned HTTP {status}"));
    AppError::gateway(message).with_detail("http_status", status.as_u16())
}

/// Timeouts get their own code so the submission path can park the payment
/// as PENDING for reconciliation instead of failing it outright.
fn classify_transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::new(ErrorCode::GatewayTimeout)
    } else {
        AppError::gateway(format!("Gateway unreachable: {err}"))
    }
}

/// Map the gateway's payment status into the closed local set.
pub fn map_status(gateway_status: &str) -> PaymentStatus {
    match gateway_status {
        "approved" => PaymentStatus::Completed,
        "pending" | "in_process" | "authorized" => PaymentStatus::Pending,
        "refunded" | "cancelled" | "rejected" => PaymentStatus::Refunded,
        _ => PaymentStatus::Failed,
    }
}

/// Map the gateway's payment method id; card brands ("visa", "master", ...)
/// fall through to credit card.
pub fn map_method(method_id: &str) -> PaymentMethod {
    match method_id {
        "pix" => PaymentMethod::Pix,
        "bolbradesco" => PaymentMethod::BankTransfer,
        "debit_card" => PaymentMethod::DebitCard,
        _ => PaymentMethod::CreditCard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_table() {
        assert_eq!(map_status("approved"), PaymentStatus::Completed);
        assert_eq!(map_status("pending"), PaymentStatus::Pending);
        assert_eq!(map_status("in_process"), PaymentStatus::Pending);
        assert_eq!(map_status("authorized"), PaymentStatus::Pending);
        assert_eq!(map_status("refunded"), PaymentStatus::Refunded);
        assert_eq!(map_status("cancelled"), PaymentStatus::Refunded);
        assert_eq!(map_status("rejected"), PaymentStatus::Refunded);
        assert_eq!(map_status("charged_back"), PaymentStatus::Failed);
        assert_eq!(map_status(""), PaymentStatus::Failed);
    }

    #[test]
    fn method_mapping_defaults_to_credit_card() {
        assert_eq!(map_method("pix"), PaymentMethod::Pix);
        assert_eq!(map_method("bolbradesco"), PaymentMethod::BankTransfer);
        assert_eq!(map_method("debit_card"), PaymentMethod::DebitCard);
        assert_eq!(map_method("visa"), PaymentMethod::CreditCard);
        assert_eq!(map_method("master"), PaymentMethod::CreditCard);
        assert_eq!(map_method(""), PaymentMethod::CreditCard);
    }

    #[test]
    fn card_fields_are_omitted_when_absent() {
        let request = GatewayPaymentRequest {
            transaction_amount: "25.00".parse().unwrap(),
            description: "Order 7".into(),
            payment_method_id: "pix".into(),
            external_reference: "7".into(),
            payer: GatewayPayer {
                email: "buyer@example.com".into(),
            },
            token: None,
            installments: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("token").is_none());
        assert!(json.get("installments").is_none());
        assert_eq!(json["external_reference"], "7");
    }
}
