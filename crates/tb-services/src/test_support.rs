//! Fixtures and pre-wired collaborators for service tests

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tb_auth::CurrentUser;
use tb_core::Id;
use tb_db::{MockActivityStore, MockNotificationStore, MockTaskStore, MockUserStore};
use tb_models::{
    Category, MemberStatus, NewActivity, NewNotification, Notification, Task, TaskPriority,
    TaskStatus, User, Workspace, WorkspaceMember, WorkspaceRole,
};
use tb_notifications::{EmailAddress, EmailRenderer, MemoryEmailSender, NotificationService};

use crate::activity::ActivityService;

pub fn user_with(id: Id, roles: &[(Id, WorkspaceRole)]) -> CurrentUser {
    CurrentUser::new(id, format!("User {id}"), format!("user{id}@example.com"))
        .with_roles(roles.iter().copied())
}

pub fn account(id: Id) -> User {
    User {
        id,
        name: format!("User {id}"),
        email: format!("user{id}@example.com"),
        password_hash: None,
        avatar_url: None,
        oauth_provider: None,
        oauth_subject: None,
        token_version: 0,
        email_notifications: false,
        last_login_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn workspace(id: Id, owner_id: Id) -> Workspace {
    Workspace {
        id,
        name: format!("Workspace {id}"),
        description: None,
        is_personal: false,
        owner_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn personal_workspace(id: Id, owner_id: Id) -> Workspace {
    Workspace {
        is_personal: true,
        name: "Personal".into(),
        ..workspace(id, owner_id)
    }
}

pub fn member(
    id: Id,
    workspace_id: Id,
    user_id: Id,
    role: WorkspaceRole,
    status: MemberStatus,
) -> WorkspaceMember {
    WorkspaceMember {
        id,
        workspace_id,
        user_id,
        role,
        status,
        invited_by_id: None,
        joined_at: status.is_active().then(Utc::now),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn task(id: Id, workspace_id: Id) -> Task {
    Task {
        id,
        workspace_id,
        title: format!("Task {id}"),
        description: None,
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        start_date: None,
        due_date: None,
        completed_at: None,
        category_id: None,
        creator_id: 1,
        assignee_id: None,
        reminder_sent_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn category(id: Id, workspace_id: Id) -> Category {
    Category {
        id,
        workspace_id,
        name: format!("Category {id}"),
        color: "#6B7280".into(),
        created_by_id: Some(1),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub type Recorded<T> = Arc<Mutex<Vec<T>>>;

/// Activity service whose inserts are captured
pub fn recorded_activity() -> (Arc<ActivityService>, Recorded<NewActivity>) {
    let recorded: Recorded<NewActivity> = Arc::default();
    let sink = recorded.clone();
    let mut store = MockActivityStore::new();
    store.expect_insert().returning(move |activity| {
        sink.lock().unwrap().push(activity);
        Ok(())
    });
    let service = ActivityService::new(Arc::new(store), Arc::new(MockTaskStore::new()));
    (Arc::new(service), recorded)
}

/// Notification service whose stored notifications are captured; no emails go out
pub fn recorded_notifications() -> (Arc<NotificationService>, Recorded<NewNotification>) {
    let recorded: Recorded<NewNotification> = Arc::default();
    let sink = recorded.clone();
    let mut store = MockNotificationStore::new();
    store.expect_create().returning(move |new| {
        sink.lock().unwrap().push(new.clone());
        Ok(Notification {
            id: 1,
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
        })
    });
    let mut users = MockUserStore::new();
    users
        .expect_find_by_id()
        .returning(|id| Ok(Some(account(id))));

    let service = NotificationService::new(
        Arc::new(store),
        Arc::new(users),
        Arc::new(MemoryEmailSender::new()),
        EmailRenderer::new("http://localhost:3000", EmailAddress::new("no-reply@taskboard.test")),
    );
    (Arc::new(service), recorded)
}
