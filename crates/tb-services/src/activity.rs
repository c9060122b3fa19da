//! Activity log: recording and the three feeds

use std::sync::Arc;

use tb_auth::CurrentUser;
use tb_contracts::ActivityContract;
use tb_core::{Id, TbResult};
use tb_db::{ActivityStore, Pagination, PaginatedResult, TaskStore};
use tb_models::{ActivityLog, NewActivity};

use crate::base::{require_member, visible};

pub struct ActivityService {
    store: Arc<dyn ActivityStore>,
    tasks: Arc<dyn TaskStore>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn ActivityStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { store, tasks }
    }

    /// Never fails; a lost audit row is logged
    pub async fn record(&self, activity: NewActivity) {
        let action = activity.action;
        let entity_type = activity.entity_type;
        let entity_id = activity.entity_id;
        if let Err(e) = self.store.insert(activity).await {
            tracing::warn!(
                action = %action,
                entity_type = %entity_type,
                entity_id,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    pub async fn workspace_feed(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        pagination: Pagination,
    ) -> TbResult<PaginatedResult<ActivityLog>> {
        require_member(user, workspace_id)?;
        ActivityContract::new(user).workspace_feed(workspace_id)?;
        Ok(self.store.list_by_workspace(workspace_id, pagination).await?)
    }

    pub async fn task_feed(
        &self,
        user: &CurrentUser,
        task_id: Id,
        pagination: Pagination,
    ) -> TbResult<PaginatedResult<ActivityLog>> {
        let task = visible(user, self.tasks.find_by_id(task_id).await?, "Task", task_id)?;
        ActivityContract::new(user).task_feed(&task)?;
        Ok(self.store.list_by_task(task.id, pagination).await?)
    }

    pub async fn my_feed(
        &self,
        user: &CurrentUser,
        pagination: Pagination,
    ) -> TbResult<PaginatedResult<ActivityLog>> {
        Ok(self.store.list_by_user(user.id, pagination).await?)
    }
}
