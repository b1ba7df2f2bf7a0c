//! Application state for market-server

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::payments::gateway::GatewayClient;
use crate::relay::EventRelay;

/// Shared application state
///
/// Cheap to clone (pool and clients are handle types); one instance is
/// shared by the HTTP handlers and both background tasks.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Payment gateway HTTP client
    pub gateway: GatewayClient,
    /// Durable payment-completed event relay
    pub relay: EventRelay,
    /// Webhook signing secret shared with the gateway
    pub webhook_secret: String,
    /// Only PENDING payments older than this are swept (seconds)
    pub reconcile_cutoff_secs: u64,
    /// Reconciliation sweep period (seconds)
    pub reconcile_interval_secs: u64,
    /// Event relay outbox poll period (milliseconds)
    pub relay_poll_interval_ms: u64,
}

impl AppState {
    /// Create a new AppState: connect the pool, run migrations, build clients
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let gateway = GatewayClient::new(
            config.gateway_base_url.clone(),
            config.gateway_access_token.clone(),
            std::time::Duration::from_millis(config.gateway_timeout_ms),
        )?;

        let relay = EventRelay::new(config.relay_max_attempts);

        Ok(Self {
            pool,
            gateway,
            relay,
            webhook_secret: config.gateway_webhook_secret.clone(),
            reconcile_cutoff_secs: config.reconcile_cutoff_secs,
            reconcile_interval_secs: config.reconcile_interval_secs,
            relay_poll_interval_ms: config.relay_poll_interval_ms,
        })
    }
}
