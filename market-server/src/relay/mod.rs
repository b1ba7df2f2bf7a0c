//! Durable payment-event relay
//!
//! 事件在产生它的业务事务内写入 outbox 表，随事务一起提交或回滚，
//! 不存在“状态已变更但事件丢失”的窗口。消费 worker 轮询投递，
//! at-least-once：只有处理成功才标记投递，失败按线性退避重试，
//! 超出预算进入死信。

pub mod worker;

use shared::response::PaymentEvent;
use shared::util::{now_millis, snowflake_id};
use sqlx::{Postgres, Transaction};

use crate::db;

/// Linear retry backoff, milliseconds per failed attempt.
const BACKOFF_STEP_MS: i64 = 5_000;

/// Stages payment-completed events in the durable outbox.
#[derive(Clone)]
pub struct EventRelay {
    max_attempts: u32,
}

impl EventRelay {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Write the event into the caller's transaction. It becomes visible
    /// to the worker only when the surrounding state change commits, and
    /// disappears with it on rollback — the event and the state it
    /// describes are one atomic unit.
    pub async fn stage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &PaymentEvent,
    ) -> Result<(), sqlx::Error> {
        let id = snowflake_id();
        db::outbox::enqueue(&mut **tx, id, event, now_millis()).await?;
        tracing::info!(
            outbox_id = id,
            order_id = event.order_id,
            transaction_id = %event.transaction_id,
            "Payment event staged"
        );
        Ok(())
    }
}

/// When the next delivery attempt should run, given the attempt count
/// after the current failure.
pub fn next_attempt_at(now_millis: i64, attempts_made: u32) -> i64 {
    now_millis + BACKOFF_STEP_MS * i64::from(attempts_made)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(next_attempt_at(0, 1), 5_000);
        assert_eq!(next_attempt_at(0, 2), 10_000);
        assert_eq!(next_attempt_at(0, 4), 20_000);
        assert_eq!(next_attempt_at(1_000, 3), 16_000);
    }
}
