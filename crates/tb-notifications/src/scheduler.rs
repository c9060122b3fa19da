//! Daily scheduler for the due-date reminder job

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::watch;

use crate::reminders::DueDateReminder;

pub struct ReminderScheduler {
    reminder: Arc<DueDateReminder>,
    hour_utc: u32,
}

impl ReminderScheduler {
    pub fn new(reminder: Arc<DueDateReminder>, hour_utc: u32) -> Self {
        Self {
            reminder,
            hour_utc: hour_utc.min(23),
        }
    }

    /// First `hour_utc:00` strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now
            .date_naive()
            .and_hms_opt(self.hour_utc, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(now);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Run the job once a day until `shutdown` flips to `true` or its sender drops
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = Utc::now();
            let next = self.next_run_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next_run = %next, "Reminder job scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.reminder.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "Due-date reminder run failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Reminder scheduler stopped");
                        return;
                    }
                }
            }
        }
    }
}
