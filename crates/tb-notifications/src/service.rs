//! Notification service
//!
//! Creates in-app notifications and, for the kinds that warrant it, sends
//! an email to recipients who have email notifications enabled. Delivery
//! problems are logged; they never fail the operation that caused them.

use std::sync::Arc;

use tb_contracts::{NotificationContract, UserContext};
use tb_core::{Id, TbError, TbResult};
use tb_db::{NotificationStore, Pagination, PaginatedResult, UserStore};
use tb_models::{NewNotification, Notification, NotificationKind, User};

use crate::email::{EmailAddress, EmailContent, EmailRenderer, EmailSender};

/// Something that happened which users should hear about
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    /// Who caused it; never notified about their own action
    pub actor_id: Option<Id>,
    pub recipients: Vec<Id>,
    pub title: String,
    pub message: String,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            actor_id: None,
            recipients: Vec::new(),
            title: title.into(),
            message: message.into(),
            workspace_id: None,
            task_id: None,
        }
    }

    pub fn by(mut self, actor_id: Id) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn to(mut self, user_id: Id) -> Self {
        self.recipients.push(user_id);
        self
    }

    pub fn to_all(mut self, user_ids: impl IntoIterator<Item = Id>) -> Self {
        self.recipients.extend(user_ids);
        self
    }

    pub fn in_workspace(mut self, workspace_id: Id) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    pub fn on_task(mut self, task_id: Id) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Recipients without the actor and without duplicates, in order
    pub fn effective_recipients(&self) -> Vec<Id> {
        let mut out: Vec<Id> = Vec::with_capacity(self.recipients.len());
        for &id in &self.recipients {
            if Some(id) != self.actor_id && !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    fn email_content(&self) -> EmailContent<'_> {
        EmailContent {
            kind: self.kind,
            title: &self.title,
            message: &self.message,
            workspace_id: self.workspace_id,
            task_id: self.task_id,
        }
    }
}

/// Where and whether to email a recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: Id,
    pub name: String,
    pub email: String,
    pub email_notifications: bool,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            email_notifications: user.email_notifications,
        }
    }
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserStore>,
    sender: Arc<dyn EmailSender>,
    renderer: EmailRenderer,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserStore>,
        sender: Arc<dyn EmailSender>,
        renderer: EmailRenderer,
    ) -> Self {
        Self {
            store,
            users,
            sender,
            renderer,
        }
    }

    /// Notify every recipient of `event` except the actor
    pub async fn notify(&self, event: NotificationEvent) -> Vec<Notification> {
        let mut created = Vec::new();
        for user_id in event.effective_recipients() {
            let Some(notification) = self.create_for(&event, user_id).await else {
                continue;
            };
            if event.kind.sends_email() {
                match self.users.find_by_id(user_id).await {
                    Ok(Some(user)) => self.send_email(&event, &Recipient::from(&user)).await,
                    Ok(None) => {}
                    Err(e) => tracing::warn!(user_id, error = %e, "Could not load email recipient"),
                }
            }
            created.push(notification);
        }
        created
    }

    /// Notify one recipient whose contact details are already known
    pub async fn deliver_to(
        &self,
        event: &NotificationEvent,
        recipient: &Recipient,
    ) -> Option<Notification> {
        let notification = self.create_for(event, recipient.user_id).await?;
        if event.kind.sends_email() {
            self.send_email(event, recipient).await;
        }
        Some(notification)
    }

    async fn create_for(&self, event: &NotificationEvent, user_id: Id) -> Option<Notification> {
        let new = NewNotification {
            user_id,
            actor_id: event.actor_id,
            kind: event.kind,
            title: event.title.clone(),
            message: event.message.clone(),
            workspace_id: event.workspace_id,
            task_id: event.task_id,
        };
        match self.store.create(new).await {
            Ok(notification) => Some(notification),
            Err(e) => {
                tracing::warn!(user_id, kind = %event.kind, error = %e, "Failed to store notification");
                None
            }
        }
    }

    async fn send_email(&self, event: &NotificationEvent, recipient: &Recipient) {
        if !recipient.email_notifications {
            return;
        }
        let to = EmailAddress::new(&recipient.email).with_name(&recipient.name);
        let message = self.renderer.render(&event.email_content(), to);
        match self.sender.send(&message).await {
            Ok(id) => tracing::debug!(user_id = recipient.user_id, message_id = %id, "Notification email sent"),
            Err(e) => tracing::warn!(
                user_id = recipient.user_id,
                sender = self.sender.name(),
                error = %e,
                "Failed to send notification email"
            ),
        }
    }

    pub async fn list<U: UserContext>(
        &self,
        user: &U,
        unread_only: bool,
        pagination: Pagination,
    ) -> TbResult<PaginatedResult<Notification>> {
        Ok(self
            .store
            .list_for_user(user.user_id(), unread_only, pagination)
            .await?)
    }

    pub async fn unread_count<U: UserContext>(&self, user: &U) -> TbResult<i64> {
        Ok(self.store.unread_count(user.user_id()).await?)
    }

    pub async fn mark_read<U: UserContext>(&self, user: &U, id: Id) -> TbResult<Notification> {
        self.find_own(user, id).await?;
        Ok(self.store.mark_read(id).await?)
    }

    pub async fn mark_all_read<U: UserContext>(&self, user: &U) -> TbResult<u64> {
        Ok(self.store.mark_all_read(user.user_id()).await?)
    }

    pub async fn delete<U: UserContext>(&self, user: &U, id: Id) -> TbResult<()> {
        self.find_own(user, id).await?;
        Ok(self.store.delete(id).await?)
    }

    async fn find_own<U: UserContext>(&self, user: &U, id: Id) -> TbResult<Notification> {
        let notification = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TbError::not_found("Notification", id))?;
        NotificationContract::new(user).access(&notification)?;
        Ok(notification)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tb_models::{NewNotification, Notification, User};

    pub fn user(id: i64, email_notifications: bool) -> User {
        User {
            id,
            name: format!("User {id}"),
            email: format!("user{id}@example.com"),
            password_hash: None,
            avatar_url: None,
            oauth_provider: None,
            oauth_subject: None,
            token_version: 0,
            email_notifications,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn stored(new: NewNotification) -> Notification {
        Notification {
            id: 100 + new.user_id,
            user_id: new.user_id,
            actor_id: new.actor_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            workspace_id: new.workspace_id,
            task_id: new.task_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}
