//! Moves committed outbox rows into the notification feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::repo::{OutboxRepository, PendingDelivery};

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub interval: Duration,
    pub batch_size: u64,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl DispatchPolicy {
    /// Retry `attempts` is scheduled `attempts × retry_backoff` after `now`.
    pub fn next_attempt_at(&self, now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
        let delay = self.retry_backoff.saturating_mul(attempts);
        chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    /// Rows another dispatcher had already delivered.
    pub skipped: usize,
}

impl DispatchReport {
    fn handled(&self) -> usize {
        self.delivered + self.failed + self.skipped
    }
}

pub struct Dispatcher {
    outbox: Arc<dyn OutboxRepository>,
    policy: DispatchPolicy,
    wake: Arc<Notify>,
}

impl Dispatcher {
    pub fn new(outbox: Arc<dyn OutboxRepository>, policy: DispatchPolicy) -> Self {
        Self {
            outbox,
            policy,
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn waker(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Deliver one batch of due rows. A failing row is rescheduled and does not
    /// stop the rest of the batch.
    #[instrument(name = "notifications.dispatcher.dispatch_once", skip(self))]
    pub async fn dispatch_once(&self) -> anyhow::Result<DispatchReport> {
        let now = Utc::now();
        let due = self
            .outbox
            .due(now, self.policy.max_attempts, self.policy.batch_size)
            .await?;

        let mut report = DispatchReport::default();
        for PendingDelivery { id, attempts } in due {
            match self.outbox.deliver(id, now).await {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    let attempts = attempts + 1;
                    let next = self.policy.next_attempt_at(now, attempts);
                    if attempts >= self.policy.max_attempts {
                        warn!(outbox_id = %id, attempts, error = %e, "notification abandoned");
                    } else {
                        debug!(outbox_id = %id, attempts, %next, error = %e, "notification delivery failed");
                    }
                    self.outbox
                        .record_failure(id, attempts, next, &format!("{e:#}"))
                        .await?;
                }
            }
        }
        if report.handled() > 0 {
            debug!(?report, "dispatch pass finished");
        }
        Ok(report)
    }

    /// Runs passes until `cancel` fires. A full batch is followed by another pass
    /// right away; otherwise the loop waits for the interval or a wake-up.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) {
        info!(interval = ?self.policy.interval, "notification dispatcher started");
        loop {
            let full_batch = match self.dispatch_once().await {
                Ok(report) => report.handled() as u64 >= self.policy.batch_size,
                Err(e) => {
                    warn!(error = %e, "dispatch pass failed");
                    false
                }
            };
            if full_batch && !cancel.is_cancelled() {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = self.wake.notified() => {}
            }
        }
        info!("notification dispatcher stopped");
    }
}
