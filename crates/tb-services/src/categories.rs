//! Workspace task categories

use std::sync::Arc;

use serde_json::json;
use tb_auth::CurrentUser;
use tb_contracts::{CategoryContract, Contract};
use tb_core::{Id, TbError, TbResult};
use tb_db::CategoryStore;
use tb_models::category::DEFAULT_COLOR;
use tb_models::{
    ActivityAction, Category, CreateCategoryDto, CreateCategoryRequest, EntityType, NewActivity,
    UpdateCategoryDto, UpdateCategoryRequest,
};

use crate::activity::ActivityService;
use crate::base::{require_member, visible};

const NAME_TAKEN: &str = "has already been taken";

pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
    activity: Arc<ActivityService>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryStore>, activity: Arc<ActivityService>) -> Self {
        Self {
            categories,
            activity,
        }
    }

    async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<Category> {
        visible(user, self.categories.find_by_id(id).await?, "Category", id)
    }

    async fn ensure_unique(&self, workspace_id: Id, name: &str, exclude: Option<Id>) -> TbResult<()> {
        if self
            .categories
            .is_name_unique(workspace_id, name, exclude)
            .await?
        {
            Ok(())
        } else {
            Err(TbError::invalid("name", NAME_TAKEN))
        }
    }

    async fn record(&self, user: &CurrentUser, action: ActivityAction, category: &Category) {
        self.activity
            .record(
                NewActivity::new(user.id, action, EntityType::Category, category.id)
                    .in_workspace(category.workspace_id)
                    .with_details(json!({ "name": category.name })),
            )
            .await;
    }

    pub async fn list(&self, user: &CurrentUser, workspace_id: Id) -> TbResult<Vec<Category>> {
        require_member(user, workspace_id)?;
        CategoryContract::new(user).view(workspace_id)?;
        Ok(self.categories.list_by_workspace(workspace_id).await?)
    }

    pub async fn create(
        &self,
        user: &CurrentUser,
        workspace_id: Id,
        request: CreateCategoryRequest,
    ) -> TbResult<Category> {
        require_member(user, workspace_id)?;
        let contract = CategoryContract::new(user);
        contract.manage(workspace_id)?;
        contract.validate(&request)?;

        let name = request.name.trim().to_string();
        self.ensure_unique(workspace_id, &name, None).await?;

        let category = self
            .categories
            .create(CreateCategoryDto {
                workspace_id,
                name,
                color: request
                    .color
                    .map(|c| c.to_uppercase())
                    .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                created_by_id: user.id,
            })
            .await?;
        self.record(user, ActivityAction::Created, &category).await;
        Ok(category)
    }

    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Id,
        request: UpdateCategoryRequest,
    ) -> TbResult<Category> {
        let category = self.load(user, id).await?;
        let contract = CategoryContract::new(user);
        contract.manage(category.workspace_id)?;
        contract.validate(&request)?;

        let name = request.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            self.ensure_unique(category.workspace_id, name, Some(category.id))
                .await?;
        }

        let updated = self
            .categories
            .update(
                category.id,
                UpdateCategoryDto {
                    name,
                    color: request.color.map(|c| c.to_uppercase()),
                },
            )
            .await?;
        self.record(user, ActivityAction::Updated, &updated).await;
        Ok(updated)
    }

    /// Tasks in the category are kept and become uncategorized
    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let category = self.load(user, id).await?;
        CategoryContract::new(user).manage(category.workspace_id)?;

        self.categories.delete(category.id).await?;
        self.record(user, ActivityAction::Deleted, &category).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{category, recorded_activity, user_with};
    use mockall::predicate::{always, eq};
    use tb_db::MockCategoryStore;
    use tb_models::WorkspaceRole;

    #[tokio::test]
    async fn test_create_defaults_color() {
        let mut store = MockCategoryStore::new();
        store
            .expect_is_name_unique()
            .with(eq(10), eq("Bug"), eq(None))
            .returning(|_, _, _| Ok(true));
        store
            .expect_create()
            .withf(|dto| dto.name == "Bug" && dto.color == DEFAULT_COLOR && dto.created_by_id == 1)
            .times(1)
            .returning(|dto| {
                Ok(Category {
                    name: dto.name,
                    color: dto.color,
                    ..category(20, dto.workspace_id)
                })
            });
        let (activity, recorded) = recorded_activity();
        let service = CategoryService::new(Arc::new(store), activity);

        let admin = user_with(1, &[(10, WorkspaceRole::Admin)]);
        let created = service
            .create(
                &admin,
                10,
                CreateCategoryRequest {
                    name: " Bug ".into(),
                    color: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.color, "#6B7280");
        assert_eq!(recorded.lock().unwrap()[0].action, ActivityAction::Created);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_invalid() {
        let mut store = MockCategoryStore::new();
        store
            .expect_is_name_unique()
            .with(eq(10), always(), eq(Some(20)))
            .returning(|_, _, _| Ok(false));
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(category(id, 10))));
        store.expect_update().never();
        let (activity, _) = recorded_activity();
        let service = CategoryService::new(Arc::new(store), activity);

        let admin = user_with(1, &[(10, WorkspaceRole::Admin)]);
        let err = service
            .update(
                &admin,
                20,
                UpdateCategoryRequest {
                    name: Some("Feature".into()),
                    color: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: name has already been taken");
    }

    #[tokio::test]
    async fn test_member_cannot_manage() {
        let mut store = MockCategoryStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(category(id, 10))));
        store.expect_delete().never();
        let (activity, _) = recorded_activity();
        let service = CategoryService::new(Arc::new(store), activity);

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        assert_eq!(service.delete(&member, 20).await.unwrap_err().status_code(), 403);

        let stranger = user_with(3, &[]);
        assert_eq!(service.list(&stranger, 10).await.unwrap_err().status_code(), 404);
    }
}
