use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::service::Service;

/// Appointments handled per pass; a full pass is followed by another at once.
const BATCH: u64 = 100;

/// Periodic pass that stages day-ahead reminders.
pub struct ReminderWorker {
    service: Arc<Service>,
    interval: Duration,
    lead: chrono::Duration,
}

impl ReminderWorker {
    pub fn new(service: Arc<Service>, interval: Duration, lead: Duration) -> Self {
        Self {
            service,
            interval,
            lead: chrono::Duration::from_std(lead).unwrap_or(chrono::Duration::hours(24)),
        }
    }

    pub async fn run_once(&self) -> usize {
        match self
            .service
            .send_due_reminders(Utc::now(), self.lead, BATCH)
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "reminder pass failed");
                0
            }
        }
    }

    pub async fn run_until_cancelled(&self, cancel: CancellationToken) {
        info!(interval = ?self.interval, lead = %self.lead, "appointment reminders started");
        loop {
            let sent = self.run_once().await;
            if sent as u64 >= BATCH && !cancel.is_cancelled() {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("appointment reminders stopped");
    }
}
