//! Notification guards

use tb_core::{TbError, TbResult};
use tb_models::Notification;

use crate::base::UserContext;

pub struct NotificationContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> NotificationContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    /// Someone else's notification is reported as missing
    pub fn access(&self, notification: &Notification) -> TbResult<()> {
        if notification.user_id == self.user.user_id() {
            Ok(())
        } else {
            Err(TbError::not_found("Notification", notification.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockUser;
    use chrono::Utc;
    use tb_models::NotificationKind;

    #[test]
    fn test_only_recipient() {
        let n = Notification {
            id: 3,
            user_id: 7,
            actor_id: Some(1),
            kind: NotificationKind::TaskAssigned,
            title: "Assigned".into(),
            message: "You were assigned".into(),
            workspace_id: Some(1),
            task_id: Some(2),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        assert!(NotificationContract::new(&MockUser::new(7)).access(&n).is_ok());
        let err = NotificationContract::new(&MockUser::new(8))
            .access(&n)
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
