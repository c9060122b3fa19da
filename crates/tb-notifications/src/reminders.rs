//! Due-date reminder job
//!
//! Finds open tasks whose due date falls inside the look-ahead window and
//! that have not been reminded yet, notifies the assignee and stamps the
//! task so the next run skips it. Moving the due date clears the stamp.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tb_core::TbResult;
use tb_db::TaskStore;
use tb_models::{DueTaskReminder, NotificationKind};
use tracing::instrument;

use crate::service::{NotificationEvent, NotificationService, Recipient};

/// Outcome of one reminder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderRun {
    pub candidates: usize,
    pub reminded: usize,
}

pub struct DueDateReminder {
    tasks: Arc<dyn TaskStore>,
    notifications: Arc<NotificationService>,
    lookahead: Duration,
}

impl DueDateReminder {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        notifications: Arc<NotificationService>,
        lookahead_hours: i64,
    ) -> Self {
        Self {
            tasks,
            notifications,
            lookahead: Duration::hours(lookahead_hours.max(1)),
        }
    }

    #[instrument(skip(self), fields(lookahead_hours = self.lookahead.num_hours()))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> TbResult<ReminderRun> {
        let due = self
            .tasks
            .due_for_reminder(now, now + self.lookahead)
            .await?;

        let mut run = ReminderRun {
            candidates: due.len(),
            reminded: 0,
        };

        for task in &due {
            let event = reminder_event(task);
            let recipient = Recipient {
                user_id: task.assignee_id,
                name: task.assignee_name.clone(),
                email: task.assignee_email.clone(),
                email_notifications: task.email_notifications,
            };

            if self.notifications.deliver_to(&event, &recipient).await.is_none() {
                // Left unstamped so the next run retries
                continue;
            }

            match self.tasks.mark_reminded(task.task_id, now).await {
                Ok(()) => run.reminded += 1,
                Err(e) => tracing::warn!(task_id = task.task_id, error = %e, "Failed to mark task reminded"),
            }
        }

        tracing::info!(candidates = run.candidates, reminded = run.reminded, "Due-date reminders sent");
        Ok(run)
    }
}

fn reminder_event(task: &DueTaskReminder) -> NotificationEvent {
    NotificationEvent::new(
        NotificationKind::TaskDueSoon,
        format!("Task due soon: {}", task.title),
        format!(
            "\"{}\" in {} is due {}.",
            task.title,
            task.workspace_name,
            task.due_date.format("%Y-%m-%d %H:%M UTC")
        ),
    )
    .to(task.assignee_id)
    .in_workspace(task.workspace_id)
    .on_task(task.task_id)
}
