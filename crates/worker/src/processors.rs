//! Reminder delivery and housekeeping passes

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use urbanova_core::models::ReminderStatus;
use urbanova_core::services::ConciergeServices;

/// Outcome of one delivery pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn processed(&self) -> usize {
        self.sent + self.retried + self.failed
    }
}

/// Deliver up to `batch_size` due reminders
///
/// A reminder whose state cannot be persisted is logged and skipped; only a
/// failure to read the queue aborts the pass.
pub async fn deliver_due_reminders(
    services: &ConciergeServices,
    batch_size: usize,
    now: DateTime<Utc>,
) -> Result<BatchOutcome> {
    let due = services.reminders.due(now, batch_size).await?;
    let mut outcome = BatchOutcome::default();

    for reminder in due {
        let id = reminder.id;
        match services.reminders.deliver(reminder, now).await {
            Ok(r) => match r.status {
                ReminderStatus::Sent => outcome.sent += 1,
                ReminderStatus::Failed => outcome.failed += 1,
                _ => outcome.retried += 1,
            },
            Err(e) => error!("Failed to record delivery of reminder {}: {}", id, e),
        }
    }

    if outcome.processed() > 0 {
        info!(
            sent = outcome.sent,
            retried = outcome.retried,
            failed = outcome.failed,
            "Reminder batch processed"
        );
    }
    Ok(outcome)
}

/// Drop calendar files whose download link has expired
pub async fn purge_expired_files(services: &ConciergeServices, now: DateTime<Utc>) -> Result<usize> {
    Ok(services.calendars.purge_expired(now).await?)
}

/// Drop finished reminders older than the retention window
pub async fn purge_finished_reminders(
    services: &ConciergeServices,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    Ok(services.reminders.purge_finished(cutoff).await?)
}
