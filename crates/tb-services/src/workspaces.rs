//! Workspace lifecycle

use std::sync::Arc;

use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{Contract, UserContext, WorkspaceContract};
use tb_core::{Id, TbError, TbResult};
use tb_db::WorkspaceStore;
use tb_models::{
    ActivityAction, CreateWorkspaceDto, CreateWorkspaceRequest, EntityType, NewActivity,
    UpdateWorkspaceDto, UpdateWorkspaceRequest, Workspace, WorkspaceWithRole,
};
use tracing::info;

use crate::activity::ActivityService;
use crate::base::{found, trimmed};

pub struct WorkspaceService {
    workspaces: Arc<dyn WorkspaceStore>,
    activity: Arc<ActivityService>,
}

impl WorkspaceService {
    pub fn new(workspaces: Arc<dyn WorkspaceStore>, activity: Arc<ActivityService>) -> Self {
        Self {
            workspaces,
            activity,
        }
    }

    /// Load a workspace the caller is an active member of
    pub(crate) async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<Workspace> {
        match self.workspaces.find_by_id(id).await? {
            Some(ws) if user.is_member_of(ws.id) => Ok(ws),
            _ => Err(TbError::not_found("Workspace", id)),
        }
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        request: CreateWorkspaceRequest,
    ) -> TbResult<Workspace> {
        WorkspaceContract::new(user).validate(&request)?;

        let workspace = self
            .workspaces
            .create(CreateWorkspaceDto {
                name: request.name.trim().to_string(),
                description: trimmed(request.description).filter(|d| !d.is_empty()),
                owner_id: user.id,
                is_personal: false,
            })
            .await?;

        info!(workspace_id = workspace.id, user_id = user.id, "Workspace created");
        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Created, EntityType::Workspace, workspace.id)
                    .in_workspace(workspace.id)
                    .with_details(json!({ "name": workspace.name })),
            )
            .await;
        Ok(workspace)
    }

    pub async fn list(&self, user: &CurrentUser) -> TbResult<Vec<WorkspaceWithRole>> {
        Ok(self.workspaces.list_for_user(user.id).await?)
    }

    pub async fn get(&self, user: &CurrentUser, id: Id) -> TbResult<WorkspaceWithRole> {
        found(
            self.workspaces.find_for_user(id, user.id).await?,
            "Workspace",
            id,
        )
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        request: UpdateWorkspaceRequest,
    ) -> TbResult<Workspace> {
        let workspace = self.load(user, id).await?;
        let contract = WorkspaceContract::new(user);
        contract.update(&workspace)?;
        contract.validate(&request)?;

        let mut changed = Vec::new();
        if request.name.is_some() {
            changed.push("name");
        }
        if request.description.is_some() {
            changed.push("description");
        }
        if changed.is_empty() {
            return Ok(workspace);
        }

        let updated = self
            .workspaces
            .update(workspace.id, UpdateWorkspaceDto::from(request))
            .await?;
        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Updated, EntityType::Workspace, updated.id)
                    .in_workspace(updated.id)
                    .with_details(json!({ "fields": changed })),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let workspace = self.load(user, id).await?;
        WorkspaceContract::new(user).delete(&workspace)?;

        self.workspaces.delete(workspace.id).await?;
        info!(workspace_id = workspace.id, user_id = user.id, "Workspace deleted");

        // The workspace's own feed goes with it; keep a trace in the actor's feed
        self.activity
            .record(
                NewActivity::new(user.id, ActivityAction::Deleted, EntityType::Workspace, workspace.id)
                    .with_details(json!({ "name": workspace.name })),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{personal_workspace, recorded_activity, user_with, workspace};
    use mockall::predicate::eq;
    use tb_db::MockWorkspaceStore;
    use tb_models::WorkspaceRole;

    #[tokio::test]
    async fn test_create_records_activity() {
        let mut store = MockWorkspaceStore::new();
        store
            .expect_create()
            .withf(|dto| dto.name == "Launch" && dto.owner_id == 1 && !dto.is_personal)
            .times(1)
            .returning(|dto| {
                Ok(Workspace {
                    name: dto.name,
                    ..workspace(30, dto.owner_id)
                })
            });
        let (activity, recorded) = recorded_activity();
        let service = WorkspaceService::new(Arc::new(store), activity);

        let ws = service
            .create(
                &user_with(1, &[]),
                CreateWorkspaceRequest {
                    name: "  Launch ".into(),
                    description: Some("   ".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(ws.id, 30);
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].action, ActivityAction::Created);
        assert_eq!(recorded[0].workspace_id, Some(30));
    }

    #[tokio::test]
    async fn test_create_validates_name() {
        let mut store = MockWorkspaceStore::new();
        store.expect_create().never();
        let (activity, _) = recorded_activity();
        let err = WorkspaceService::new(Arc::new(store), activity)
            .create(
                &user_with(1, &[]),
                CreateWorkspaceRequest {
                    name: "   ".into(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_update_requires_edit_permission() {
        let mut store = MockWorkspaceStore::new();
        store
            .expect_find_by_id()
            .with(eq(10))
            .returning(|id| Ok(Some(workspace(id, 1))));
        store.expect_update().never();
        let (activity, _) = recorded_activity();
        let service = WorkspaceService::new(Arc::new(store), activity);

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        let err = service
            .update(
                &member,
                10,
                UpdateWorkspaceRequest {
                    name: Some("Renamed".into()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let outsider = user_with(3, &[]);
        let err = service
            .update(&outsider, 10, UpdateWorkspaceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_personal_workspace_cannot_be_deleted() {
        let mut store = MockWorkspaceStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(personal_workspace(id, 1))));
        store.expect_delete().never();
        let (activity, _) = recorded_activity();

        let owner = user_with(1, &[(5, WorkspaceRole::Owner)]);
        let err = WorkspaceService::new(Arc::new(store), activity)
            .delete(&owner, 5)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_owner_deletes_workspace() {
        let mut store = MockWorkspaceStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(workspace(id, 1))));
        store.expect_delete().with(eq(6)).times(1).returning(|_| Ok(()));
        let (activity, recorded) = recorded_activity();

        let owner = user_with(1, &[(6, WorkspaceRole::Owner)]);
        WorkspaceService::new(Arc::new(store), activity)
            .delete(&owner, 6)
            .await
            .unwrap();
        assert_eq!(recorded.lock().unwrap()[0].workspace_id, None);
    }
}
