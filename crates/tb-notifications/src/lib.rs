//! # tb-notifications
//!
//! In-app notifications, email delivery and the due-date reminder job.
//!
//! - [`NotificationService`] stores notifications and emails the kinds that
//!   warrant it
//! - [`EmailSender`] implementations for log, HTTP API and in-memory delivery
//! - [`DueDateReminder`] and the daily [`ReminderScheduler`]

pub mod email;
pub mod reminders;
pub mod scheduler;
pub mod service;

pub use email::{
    sender_from_config, EmailAddress, EmailContent, EmailError, EmailMessage, EmailRenderer,
    EmailSender, HttpEmailSender, LogEmailSender, MemoryEmailSender,
};
pub use reminders::{DueDateReminder, ReminderRun};
pub use scheduler::ReminderScheduler;
pub use service::{NotificationEvent, NotificationService, Recipient};
