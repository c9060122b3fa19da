//! Resource representers
//!
//! Models serialize as camelCase JSON; a representer adds the `_type`
//! discriminator and a `_links` object of related resources.

use std::collections::BTreeMap;

use serde::Serialize;
use tb_core::{Entity, LinkObject, PaginatedResponse, PaginationParams};
use tb_db::PaginatedResult;
use tb_models::{
    ActivityLog, Attachment, Category, CommentWithAuthor, Invitation, MemberWithUser,
    Notification, SubTask, Task, User, UserSummary, Workspace, WorkspaceMember,
    WorkspaceWithRole,
};

use crate::routes::API_PREFIX;

#[derive(Debug, Clone, Serialize)]
pub struct Resource<T> {
    #[serde(rename = "_type")]
    pub type_name: &'static str,

    #[serde(flatten)]
    pub body: T,

    #[serde(rename = "_links", skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<&'static str, LinkObject>,
}

impl<T: Serialize> Resource<T> {
    pub fn new(type_name: &'static str, body: T) -> Self {
        Self {
            type_name,
            body,
            links: BTreeMap::new(),
        }
    }

    pub fn link(mut self, rel: &'static str, path: impl std::fmt::Display) -> Self {
        self.links
            .insert(rel, LinkObject::new(format!("{API_PREFIX}{path}")));
        self
    }

    pub fn link_opt(self, rel: &'static str, path: Option<String>) -> Self {
        match path {
            Some(path) => self.link(rel, path),
            None => self,
        }
    }
}

/// Resource named after its entity's `TYPE_NAME`
fn entity<T: Entity + Serialize>(body: T) -> Resource<T> {
    Resource::new(T::TYPE_NAME, body)
}

pub fn user(user: User) -> Resource<User> {
    entity(user).link("self", "/users/me")
}

pub fn user_summary(user: UserSummary) -> Resource<UserSummary> {
    Resource::new("User", user)
}

pub fn workspace(workspace: Workspace) -> Resource<Workspace> {
    let id = workspace.id;
    entity(workspace)
        .link("self", format!("/workspaces/{id}"))
        .link("members", format!("/workspaces/{id}/members"))
        .link("categories", format!("/workspaces/{id}/categories"))
        .link("tasks", format!("/tasks?workspace={id}"))
        .link("activity", format!("/workspaces/{id}/activity"))
}

pub fn workspace_with_role(workspace: WorkspaceWithRole) -> Resource<WorkspaceWithRole> {
    let id = workspace.workspace.id;
    Resource::new(Workspace::TYPE_NAME, workspace)
        .link("self", format!("/workspaces/{id}"))
        .link("members", format!("/workspaces/{id}/members"))
        .link("categories", format!("/workspaces/{id}/categories"))
        .link("tasks", format!("/tasks?workspace={id}"))
        .link("activity", format!("/workspaces/{id}/activity"))
}

pub fn member(member: WorkspaceMember) -> Resource<WorkspaceMember> {
    let path = format!("/workspaces/{}/members/{}", member.workspace_id, member.user_id);
    let workspace = format!("/workspaces/{}", member.workspace_id);
    entity(member).link("self", path).link("workspace", workspace)
}

pub fn member_with_user(member: MemberWithUser) -> Resource<MemberWithUser> {
    let path = format!(
        "/workspaces/{}/members/{}",
        member.member.workspace_id, member.member.user_id
    );
    Resource::new(WorkspaceMember::TYPE_NAME, member).link("self", path)
}

pub fn invitation(invitation: Invitation) -> Resource<Invitation> {
    let id = invitation.workspace_id;
    Resource::new("Invitation", invitation)
        .link("accept", format!("/invitations/{id}/accept"))
        .link("decline", format!("/invitations/{id}/decline"))
}

pub fn category(category: Category) -> Resource<Category> {
    let id = category.id;
    let workspace = format!("/workspaces/{}", category.workspace_id);
    entity(category)
        .link("self", format!("/categories/{id}"))
        .link("workspace", workspace)
}

pub fn task(task: Task) -> Resource<Task> {
    let id = task.id;
    let workspace = format!("/workspaces/{}", task.workspace_id);
    let category = task.category_id.map(|c| format!("/categories/{c}"));
    entity(task)
        .link("self", format!("/tasks/{id}"))
        .link("workspace", workspace)
        .link_opt("category", category)
        .link("subtasks", format!("/tasks/{id}/subtasks"))
        .link("comments", format!("/tasks/{id}/comments"))
        .link("attachments", format!("/tasks/{id}/attachments"))
        .link("activity", format!("/tasks/{id}/activity"))
}

pub fn subtask(subtask: SubTask) -> Resource<SubTask> {
    let id = subtask.id;
    let task = format!("/tasks/{}", subtask.task_id);
    entity(subtask)
        .link("self", format!("/subtasks/{id}"))
        .link("toggle", format!("/subtasks/{id}/toggle"))
        .link("task", task)
}

pub fn comment(comment: CommentWithAuthor) -> Resource<CommentWithAuthor> {
    let id = comment.comment.id;
    let task = format!("/tasks/{}", comment.comment.task_id);
    Resource::new("Comment", comment)
        .link("self", format!("/comments/{id}"))
        .link("task", task)
}

pub fn attachment(attachment: Attachment) -> Resource<Attachment> {
    let id = attachment.id;
    let task = format!("/tasks/{}", attachment.task_id);
    entity(attachment)
        .link("self", format!("/attachments/{id}"))
        .link("download", format!("/attachments/{id}/download"))
        .link("task", task)
}

pub fn notification(notification: Notification) -> Resource<Notification> {
    let id = notification.id;
    let task = notification.task_id.map(|t| format!("/tasks/{t}"));
    entity(notification)
        .link("markRead", format!("/notifications/{id}/read"))
        .link_opt("task", task)
}

pub fn activity(activity: ActivityLog) -> Resource<ActivityLog> {
    let task = activity.task_id.map(|t| format!("/tasks/{t}"));
    let workspace = activity.workspace_id.map(|w| format!("/workspaces/{w}"));
    entity(activity)
        .link_opt("task", task)
        .link_opt("workspace", workspace)
}

/// Collection envelope for one page of a paginated query
pub fn page<T, R>(
    result: PaginatedResult<T>,
    path: &str,
    represent: impl FnMut(T) -> R,
) -> PaginatedResponse<R> {
    let params = PaginationParams {
        offset: result.offset,
        page_size: result.limit,
    };
    let href = format!("{API_PREFIX}{path}");
    PaginatedResponse::new(
        result.items.into_iter().map(represent).collect(),
        result.total,
        &params,
        &href,
    )
}

/// Collection envelope for a list that is returned whole
pub fn all<T, R>(items: Vec<T>, path: &str, represent: impl FnMut(T) -> R) -> PaginatedResponse<R> {
    let total = items.len() as i64;
    let params = PaginationParams {
        offset: 0,
        page_size: total.max(1),
    };
    let href = format!("{API_PREFIX}{path}");
    PaginatedResponse::new(
        items.into_iter().map(represent).collect(),
        total,
        &params,
        &href,
    )
}
