//! Reconciliation sweep for stale PENDING payments
//!
//! Webhook 丢失或超时遗留的 PENDING 支付由这里兜底：
//! 定期回查网关并走统一的状态收敛入口。

use tokio_util::sync::CancellationToken;

use crate::db;
use crate::error::ServiceResult;
use crate::payments::gateway::map_status;
use crate::payments::service;
use crate::state::AppState;
use shared::util::now_millis;

pub struct PaymentReconciler {
    state: AppState,
    shutdown: CancellationToken,
}

impl PaymentReconciler {
    pub fn new(state: AppState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    pub async fn run(self) {
        let period = std::time::Duration::from_secs(self.state.reconcile_interval_secs);
        let mut interval = tokio::time::interval(period);
        // the first tick fires immediately; skip it so a restart doesn't
        // hammer the gateway before the service has settled
        interval.tick().await;
        tracing::info!(period_secs = period.as_secs(), "Payment reconciler started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Payment reconciler stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = ?e, "Reconciliation sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep: every PENDING payment older than the cutoff gets
    /// re-queried at the gateway. Per-payment failures are logged and do
    /// not abort the batch.
    async fn sweep(&self) -> Result<(), sqlx::Error> {
        let cutoff = now_millis() - (self.state.reconcile_cutoff_secs as i64) * 1000;
        let stale = db::payments::list_pending_before(&self.state.pool, cutoff).await?;
        if stale.is_empty() {
            return Ok(());
        }
        tracing::info!(count = stale.len(), "Reconciling stale PENDING payments");

        for row in stale {
            let payment_id = row.id;
            if let Err(e) = self.reconcile_one(row).await {
                let app_err: shared::error::AppError = e.into();
                tracing::warn!(
                    payment_id,
                    code = %app_err.code,
                    message = %app_err.message,
                    "Failed to reconcile payment, will retry next sweep"
                );
            }
        }
        Ok(())
    }

    async fn reconcile_one(&self, row: db::payments::PaymentRow) -> ServiceResult<()> {
        let mut payment = row.into_payment()?;

        let gateway_payment = match &payment.transaction_id {
            Some(transaction_id) => self.state.gateway.get_payment(transaction_id).await?,
            // timed-out submission: the transaction id was never learned,
            // find the charge by our order id
            None => {
                match self
                    .state
                    .gateway
                    .search_by_reference(payment.order_id)
                    .await?
                {
                    Some(found) => {
                        let transaction_id = found.id.to_string();
                        db::payments::set_transaction_id(
                            &self.state.pool,
                            payment.id,
                            &transaction_id,
                        )
                        .await?;
                        payment.transaction_id = Some(transaction_id);
                        found
                    }
                    // the charge never reached the gateway; leave the row
                    // PENDING for the operator (no evidence to fail it on)
                    None => {
                        tracing::warn!(
                            payment_id = payment.id,
                            order_id = payment.order_id,
                            "No gateway record found for parked payment"
                        );
                        return Ok(());
                    }
                }
            }
        };

        let new_status = map_status(&gateway_payment.status);
        service::apply_gateway_status(&self.state, &payment, new_status).await
    }
}
