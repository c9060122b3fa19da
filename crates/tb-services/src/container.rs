//! Wiring of stores and services

use std::sync::Arc;

use tb_attachments::{AllowedFileTypes, Storage};
use tb_auth::{JwtService, OAuthService};
use tb_db::{
    ActivityRepository, ActivityStore, AttachmentRepository, AttachmentStore, CategoryRepository,
    CategoryStore, CommentRepository, CommentStore, Database, MemberRepository, MemberStore,
    NotificationRepository, NotificationStore, SubTaskRepository, SubTaskStore, TaskRepository,
    TaskStore, UserRepository, UserStore, WorkspaceRepository, WorkspaceStore,
};
use tb_notifications::NotificationService;

use crate::{
    ActivityService, AttachmentService, AuthService, CategoryService, CommentService,
    MemberService, SubTaskService, TaskService, UserService, WorkspaceService,
};

/// Every store behind its trait, so tests can swap in mocks
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub members: Arc<dyn MemberStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub subtasks: Arc<dyn SubTaskStore>,
    pub comments: Arc<dyn CommentStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub activities: Arc<dyn ActivityStore>,
}

impl Stores {
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            workspaces: Arc::new(WorkspaceRepository::new(pool.clone())),
            members: Arc::new(MemberRepository::new(pool.clone())),
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            subtasks: Arc::new(SubTaskRepository::new(pool.clone())),
            comments: Arc::new(CommentRepository::new(pool.clone())),
            categories: Arc::new(CategoryRepository::new(pool.clone())),
            attachments: Arc::new(AttachmentRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            activities: Arc::new(ActivityRepository::new(pool)),
        }
    }
}

/// All business services, shared by the HTTP handlers
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub workspaces: Arc<WorkspaceService>,
    pub members: Arc<MemberService>,
    pub tasks: Arc<TaskService>,
    pub subtasks: Arc<SubTaskService>,
    pub comments: Arc<CommentService>,
    pub categories: Arc<CategoryService>,
    pub attachments: Arc<AttachmentService>,
    pub activity: Arc<ActivityService>,
    pub notifications: Arc<NotificationService>,
}

impl Services {
    pub fn build(
        stores: &Stores,
        jwt: Arc<JwtService>,
        oauth: Arc<OAuthService>,
        storage: Arc<dyn Storage>,
        file_types: AllowedFileTypes,
        notifications: Arc<NotificationService>,
    ) -> Self {
        let activity = Arc::new(ActivityService::new(
            stores.activities.clone(),
            stores.tasks.clone(),
        ));

        Self {
            auth: Arc::new(AuthService::new(stores.users.clone(), jwt, oauth)),
            users: Arc::new(UserService::new(
                stores.users.clone(),
                stores.workspaces.clone(),
            )),
            workspaces: Arc::new(WorkspaceService::new(
                stores.workspaces.clone(),
                activity.clone(),
            )),
            members: Arc::new(MemberService::new(
                stores.workspaces.clone(),
                stores.members.clone(),
                stores.users.clone(),
                activity.clone(),
                notifications.clone(),
            )),
            tasks: Arc::new(TaskService::new(
                stores.tasks.clone(),
                stores.members.clone(),
                stores.categories.clone(),
                activity.clone(),
                notifications.clone(),
            )),
            subtasks: Arc::new(SubTaskService::new(
                stores.subtasks.clone(),
                stores.tasks.clone(),
                activity.clone(),
            )),
            comments: Arc::new(CommentService::new(
                stores.comments.clone(),
                stores.tasks.clone(),
                activity.clone(),
                notifications.clone(),
            )),
            categories: Arc::new(CategoryService::new(
                stores.categories.clone(),
                activity.clone(),
            )),
            attachments: Arc::new(AttachmentService::new(
                stores.attachments.clone(),
                stores.tasks.clone(),
                storage,
                file_types,
                activity.clone(),
            )),
            activity,
            notifications,
        }
    }
}
