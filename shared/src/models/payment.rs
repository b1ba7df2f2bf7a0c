//! Payment model and enums

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Local payment status
///
/// Gateway statuses are mapped into this closed set by the gateway client;
/// anything unrecognized maps to `Failed`, never silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "REFUNDED" => Ok(Self::Refunded),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("Unknown payment status: {other}")),
        }
    }
}

/// Payment method — closed tagged variant, no dynamic dispatch over strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
    BankTransfer,
}

impl PaymentMethod {
    /// Card-like methods require a card token and installments;
    /// PIX and boleto-style bank transfer require neither.
    pub fn requires_card_token(&self) -> bool {
        matches!(self, Self::CreditCard | Self::DebitCard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "CREDIT_CARD",
            Self::DebitCard => "DEBIT_CARD",
            Self::Pix => "PIX",
            Self::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "DEBIT_CARD" => Ok(Self::DebitCard),
            "PIX" => Ok(Self::Pix),
            "BANK_TRANSFER" => Ok(Self::BankTransfer),
            other => Err(format!("Unknown payment method: {other}")),
        }
    }
}

/// Payment entity
///
/// At most one payment per order in steady state. The idempotency key is
/// immutable once set and unique at the storage layer — it is the
/// authoritative guard against duplicate charge creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// Order reference (non-owning)
    pub order_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway transaction id; NULL until the gateway has answered
    pub transaction_id: Option<String>,
    /// Caller-supplied UUID, unique, immutable once set
    pub idempotency_key: String,
    /// Submission timestamp (Unix millis)
    pub payment_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_methods_require_token() {
        assert!(PaymentMethod::CreditCard.requires_card_token());
        assert!(PaymentMethod::DebitCard.requires_card_token());
        assert!(!PaymentMethod::Pix.requires_card_token());
        assert!(!PaymentMethod::BankTransfer.requires_card_token());
    }

    #[test]
    fn status_roundtrip() {
        for s in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Refunded,
            PaymentStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<PaymentStatus>().unwrap(), s);
        }
    }
}
