//! Outbox consumer worker
//!
//! 轮询到期的 outbox 行，把订单收敛到 PAID 并触发买家通知钩子。
//! 处理是幂等的，重复投递无副作用。

use tokio_util::sync::CancellationToken;

use crate::db;
use crate::error::ServiceResult;
use crate::orders;
use crate::relay::next_attempt_at;
use crate::state::AppState;
use shared::response::PaymentEvent;
use shared::util::now_millis;

const BATCH_SIZE: i64 = 50;

pub struct RelayWorker {
    state: AppState,
    shutdown: CancellationToken,
}

impl RelayWorker {
    pub fn new(state: AppState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    pub async fn run(self) {
        let period = std::time::Duration::from_millis(self.state.relay_poll_interval_ms);
        let mut interval = tokio::time::interval(period);
        tracing::info!(period_ms = period.as_millis() as u64, "Relay worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Relay worker stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain_due().await {
                        tracing::error!(error = %e, "Relay poll failed");
                    }
                }
            }
        }
    }

    async fn drain_due(&self) -> Result<(), sqlx::Error> {
        let now = now_millis();
        let due = db::outbox::fetch_due(&self.state.pool, now, BATCH_SIZE).await?;

        for row in due {
            let outbox_id = row.id;
            let attempts_before = row.attempts as u32;
            match self.deliver(row).await {
                Ok(()) => {
                    db::outbox::mark_delivered(&self.state.pool, outbox_id, now_millis()).await?;
                }
                Err(e) => {
                    let app_err: shared::error::AppError = e.into();
                    let attempts_made = attempts_before + 1;
                    if attempts_made >= self.state.relay.max_attempts() {
                        tracing::error!(
                            outbox_id,
                            attempts = attempts_made,
                            code = %app_err.code,
                            message = %app_err.message,
                            "Event exhausted its attempt budget, dead-lettering"
                        );
                        db::outbox::dead_letter(&self.state.pool, outbox_id, now_millis()).await?;
                    } else {
                        tracing::warn!(
                            outbox_id,
                            attempts = attempts_made,
                            code = %app_err.code,
                            "Event delivery failed, scheduling retry"
                        );
                        let next = next_attempt_at(now_millis(), attempts_made);
                        db::outbox::mark_failed(&self.state.pool, outbox_id, next).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Process one event: converge the order to PAID (idempotent) and fire
    /// the buyer notification hook.
    async fn deliver(&self, row: db::outbox::OutboxRow) -> ServiceResult<()> {
        let event = row.into_event()?;
        orders::service::approve_order(&self.state.pool, event.order_id).await?;
        notify_buyer(&event);
        Ok(())
    }
}

/// Notification hook. Actual email delivery is an external collaborator;
/// the hook records the confirmation for it to pick up.
fn notify_buyer(event: &PaymentEvent) {
    tracing::info!(
        order_id = event.order_id,
        email = %event.email,
        amount = %event.amount,
        transaction_id = %event.transaction_id,
        "Payment confirmed, buyer notification dispatched"
    );
}
