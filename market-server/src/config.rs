//! Server configuration
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | DATABASE_URL | (required) | PostgreSQL 连接地址 |
//! | HTTP_PORT | 8080 | HTTP 服务端口 |
//! | ENVIRONMENT | development | 运行环境 |
//! | GATEWAY_BASE_URL | https://api.mercadopago.com | 支付网关地址 |
//! | GATEWAY_ACCESS_TOKEN | (required in prod) | 网关访问令牌 |
//! | GATEWAY_WEBHOOK_SECRET | (required in prod) | Webhook 签名密钥 |
//! | GATEWAY_TIMEOUT_MS | 10000 | 网关调用超时(毫秒) |
//! | RECONCILE_INTERVAL_SECS | 300 | 对账扫描周期(秒) |
//! | RECONCILE_CUTOFF_SECS | 300 | 对账只看早于此时限的 PENDING |
//! | RELAY_POLL_INTERVAL_MS | 1000 | 事件中继轮询周期(毫秒) |
//! | RELAY_MAX_ATTEMPTS | 5 | 事件投递尝试上限，超过进死信 |

use anyhow::{Context, bail};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP API port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Payment gateway base URL
    pub gateway_base_url: String,
    /// Payment gateway access token (Bearer)
    pub gateway_access_token: String,
    /// Webhook signing secret shared with the gateway
    pub gateway_webhook_secret: String,
    /// Bounded timeout for every gateway call (milliseconds)
    pub gateway_timeout_ms: u64,
    /// Reconciliation sweep period (seconds)
    pub reconcile_interval_secs: u64,
    /// Only PENDING payments older than this are swept (seconds)
    pub reconcile_cutoff_secs: u64,
    /// Event relay outbox poll period (milliseconds)
    pub relay_poll_interval_ms: u64,
    /// Delivery attempts before an outbox row is dead-lettered
    pub relay_max_attempts: u32,
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> anyhow::Result<String> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    bail!("{name} must be set in {environment} environment");
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            bail!("{name} must not be empty in {environment} environment");
        }
        Ok(val)
    }

    fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            http_port: Self::env_parse("HTTP_PORT", 8080),
            gateway_base_url: std::env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".into()),
            gateway_access_token: Self::require_secret("GATEWAY_ACCESS_TOKEN", &environment)?,
            gateway_webhook_secret: Self::require_secret("GATEWAY_WEBHOOK_SECRET", &environment)?,
            gateway_timeout_ms: Self::env_parse("GATEWAY_TIMEOUT_MS", 10_000),
            reconcile_interval_secs: Self::env_parse("RECONCILE_INTERVAL_SECS", 300),
            reconcile_cutoff_secs: Self::env_parse("RECONCILE_CUTOFF_SECS", 300),
            relay_poll_interval_ms: Self::env_parse("RELAY_POLL_INTERVAL_MS", 1_000),
            relay_max_attempts: Self::env_parse("RELAY_MAX_ATTEMPTS", 5),
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_fall_back_in_development_only() {
        // deliberately unset variable
        let name = "MARKET_TEST_SECRET_THAT_IS_NEVER_SET";

        let dev = Config::require_secret(name, "development").unwrap();
        assert!(dev.contains("not-for-production"));

        assert!(Config::require_secret(name, "production").is_err());
        assert!(Config::require_secret(name, "staging").is_err());
    }

    #[test]
    fn env_parse_falls_back_on_missing_or_garbage() {
        assert_eq!(
            Config::env_parse("MARKET_TEST_PORT_THAT_IS_NEVER_SET", 8080_u16),
            8080
        );
    }
}
