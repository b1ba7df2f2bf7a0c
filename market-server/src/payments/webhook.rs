//! Webhook signature verification and payload parsing
//!
//! The gateway signs each notification with HMAC-SHA256 over the manifest
//! `id:{data_id};request-id:{request_id};ts:{ts};`. Verification fails
//! closed: a missing or malformed header is treated exactly like a bad
//! signature, and no status transition ever happens before verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify the `x-signature` header (`ts=<unix-seconds>,v1=<hex-hmac>`).
pub fn verify_signature(
    x_signature: &str,
    x_request_id: &str,
    data_id: &str,
    secret: &str,
) -> bool {
    let Some((ts, v1)) = parse_signature_header(x_signature) else {
        return false;
    };
    let Ok(expected) = hex::decode(v1) else {
        return false;
    };

    let manifest = format!("id:{data_id};request-id:{x_request_id};ts:{ts};");
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(manifest.as_bytes());
    // constant-time comparison
    mac.verify_slice(&expected).is_ok()
}

/// Pull `ts` and `v1` out of the comma-separated header parts.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        let (key, value) = part.split_once('=')?;
        match key.trim() {
            "ts" => ts = Some(value.trim()),
            "v1" => v1 = Some(value.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

/// Parsed notification: which payment resource it refers to.
#[derive(Debug, PartialEq)]
pub enum WebhookPayload {
    /// A payment notification carrying the gateway transaction id
    Payment { data_id: String },
    /// Some other topic; acknowledged and ignored
    Ignored,
}

/// Accepts both notification shapes the gateway sends: `type`/`topic` =
/// "payment" with the resource id at `data.id` or top-level `id`. The id
/// may arrive as a JSON string or number.
pub fn parse_payload(body: &serde_json::Value) -> Option<WebhookPayload> {
    let kind = body
        .get("type")
        .or_else(|| body.get("topic"))
        .and_then(|v| v.as_str())?;
    if kind != "payment" {
        return Some(WebhookPayload::Ignored);
    }

    let id = body
        .get("data")
        .and_then(|d| d.get("id"))
        .or_else(|| body.get("id"))?;
    let data_id = match id {
        serde_json::Value::String(s) if !s.is_empty() => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(WebhookPayload::Payment { data_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-webhook-secret";

    fn sign(data_id: &str, request_id: &str, ts: &str) -> String {
        let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};");
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_accepted() {
        let v1 = sign("12345", "req-1", "1700000000");
        let header = format!("ts=1700000000,v1={v1}");
        assert!(verify_signature(&header, "req-1", "12345", SECRET));
    }

    #[test]
    fn single_hex_char_tamper_rejected() {
        let v1 = sign("12345", "req-1", "1700000000");
        let mut tampered: Vec<char> = v1.chars().collect();
        tampered[0] = if tampered[0] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();
        let header = format!("ts=1700000000,v1={tampered}");
        assert!(!verify_signature(&header, "req-1", "12345", SECRET));
    }

    #[test]
    fn wrong_request_id_rejected() {
        let v1 = sign("12345", "req-1", "1700000000");
        let header = format!("ts=1700000000,v1={v1}");
        assert!(!verify_signature(&header, "req-2", "12345", SECRET));
    }

    #[test]
    fn malformed_header_rejected() {
        assert!(!verify_signature("", "req-1", "12345", SECRET));
        assert!(!verify_signature("ts=1700000000", "req-1", "12345", SECRET));
        assert!(!verify_signature("v1=deadbeef", "req-1", "12345", SECRET));
        assert!(!verify_signature("garbage", "req-1", "12345", SECRET));
        assert!(!verify_signature("ts=1,v1=nothex!!", "req-1", "12345", SECRET));
    }

    #[test]
    fn payload_id_from_data_object() {
        let body = json!({"type": "payment", "data": {"id": "999"}});
        assert_eq!(
            parse_payload(&body),
            Some(WebhookPayload::Payment {
                data_id: "999".into()
            })
        );
    }

    #[test]
    fn payload_id_from_top_level_number() {
        let body = json!({"topic": "payment", "id": 999});
        assert_eq!(
            parse_payload(&body),
            Some(WebhookPayload::Payment {
                data_id: "999".into()
            })
        );
    }

    #[test]
    fn non_payment_topic_is_ignored() {
        let body = json!({"type": "merchant_order", "data": {"id": "1"}});
        assert_eq!(parse_payload(&body), Some(WebhookPayload::Ignored));
    }

    #[test]
    fn missing_type_and_id_are_malformed() {
        assert_eq!(parse_payload(&json!({"data": {"id": "1"}})), None);
        assert_eq!(parse_payload(&json!({"type": "payment"})), None);
    }
}
