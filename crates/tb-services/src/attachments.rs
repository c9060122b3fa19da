//! Task file attachments: metadata in the database, bytes in [`Storage`]

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tb_attachments::{normalize_filename, storage_key_for, AllowedFileTypes, Storage};
use tb_auth::CurrentUser;
use tb_contracts::AttachmentContract;
use tb_core::{Id, TbResult};
use tb_db::{AttachmentStore, TaskStore};
use tb_models::{ActivityAction, Attachment, EntityType, NewActivity, NewAttachment, Task};
use tracing::{info, warn};

use crate::activity::ActivityService;
use crate::base::{found, visible};

/// A file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

pub struct AttachmentService {
    attachments: Arc<dyn AttachmentStore>,
    tasks: Arc<dyn TaskStore>,
    storage: Arc<dyn Storage>,
    policy: AllowedFileTypes,
    activity: Arc<ActivityService>,
}

impl AttachmentService {
    pub fn new(
        attachments: Arc<dyn AttachmentStore>,
        tasks: Arc<dyn TaskStore>,
        storage: Arc<dyn Storage>,
        policy: AllowedFileTypes,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            attachments,
            tasks,
            storage,
            policy,
            activity,
        }
    }

    pub fn policy(&self) -> &AllowedFileTypes {
        &self.policy
    }

    async fn task(&self, user: &CurrentUser, task_id: Id) -> TbResult<Task> {
        visible(user, self.tasks.find_by_id(task_id).await?, "Task", task_id)
    }

    async fn load(&self, user: &CurrentUser, id: Id) -> TbResult<(Attachment, Task)> {
        let attachment = found(self.attachments.find_by_id(id).await?, "Attachment", id)?;
        let task = self.tasks.find_by_id(attachment.task_id).await?;
        let task = visible(user, task, "Attachment", id)?;
        Ok((attachment, task))
    }

    pub async fn list(&self, user: &CurrentUser, task_id: Id) -> TbResult<Vec<Attachment>> {
        let task = self.task(user, task_id).await?;
        AttachmentContract::new(user).view(&task)?;
        Ok(self.attachments.list_by_task(task.id).await?)
    }

    pub async fn upload(
        &self,
        user: &CurrentUser,
        task_id: Id,
        upload: Upload,
    ) -> TbResult<Attachment> {
        let task = self.task(user, task_id).await?;
        AttachmentContract::new(user).upload(&task)?;

        // Checked, keyed and stored under the same name
        let filename = normalize_filename(&upload.filename);
        let content_type = self
            .policy
            .content_type_for(&filename, upload.content_type.as_deref());
        self.policy
            .check(&filename, &content_type, upload.data.len() as u64)?;

        let key = storage_key_for(task.id, &filename);
        let stored = self.storage.put(&key, upload.data).await?;

        let created = self
            .attachments
            .create(NewAttachment {
                task_id: task.id,
                uploader_id: user.id,
                filename,
                storage_key: key.clone(),
                content_type,
                file_size: stored.size as i64,
                digest: stored.digest,
            })
            .await;
        let attachment = match created {
            Ok(attachment) => attachment,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };
        info!(
            attachment_id = attachment.id,
            task_id = task.id,
            size = attachment.file_size,
            "Attachment uploaded"
        );

        self.activity
            .record(
                NewActivity::new(
                    user.id,
                    ActivityAction::AttachmentAdded,
                    EntityType::Attachment,
                    attachment.id,
                )
                .in_workspace(task.workspace_id)
                .on_task(task.id)
                .with_details(json!({ "filename": attachment.filename, "size": attachment.file_size })),
            )
            .await;
        Ok(attachment)
    }

    pub async fn download(&self, user: &CurrentUser, id: Id) -> TbResult<(Attachment, Bytes)> {
        let (attachment, task) = self.load(user, id).await?;
        AttachmentContract::new(user).view(&task)?;
        let data = self.storage.get(&attachment.storage_key).await?;
        Ok((attachment, data))
    }

    pub async fn delete(&self, user: &CurrentUser, id: Id) -> TbResult<()> {
        let (attachment, task) = self.load(user, id).await?;
        AttachmentContract::new(user).delete(&attachment, &task)?;

        self.attachments.delete(attachment.id).await?;
        // The row is gone; a leftover file is only wasted space
        if let Err(e) = self.storage.delete(&attachment.storage_key).await {
            warn!(key = %attachment.storage_key, error = %e, "Failed to delete stored file");
        }

        self.activity
            .record(
                NewActivity::new(
                    user.id,
                    ActivityAction::AttachmentRemoved,
                    EntityType::Attachment,
                    attachment.id,
                )
                .in_workspace(task.workspace_id)
                .on_task(task.id)
                .with_details(json!({ "filename": attachment.filename })),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{recorded_activity, task, user_with};
    use chrono::Utc;
    use tb_attachments::MemoryStorage;
    use tb_db::{MockAttachmentStore, MockTaskStore, RepositoryError};
    use tb_models::WorkspaceRole;

    fn tasks() -> MockTaskStore {
        let mut tasks = MockTaskStore::new();
        tasks
            .expect_find_by_id()
            .returning(|id| Ok(Some(task(id, 10))));
        tasks
    }

    fn stored(new: NewAttachment) -> Attachment {
        Attachment {
            id: 70,
            task_id: new.task_id,
            uploader_id: Some(new.uploader_id),
            filename: new.filename,
            storage_key: new.storage_key,
            content_type: new.content_type,
            file_size: new.file_size,
            digest: new.digest,
            created_at: Utc::now(),
        }
    }

    fn upload(filename: &str, data: &'static [u8]) -> Upload {
        Upload {
            filename: filename.to_string(),
            content_type: None,
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_upload_stores_bytes_and_metadata() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments
            .expect_create()
            .withf(|new| {
                new.task_id == 5
                    && new.content_type == "text/plain"
                    && new.file_size == 5
                    && new.storage_key.starts_with("tasks/5/")
                    && new.digest.len() == 64
            })
            .times(1)
            .returning(|new| Ok(stored(new)));
        let (activity, recorded) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        let attachment = service
            .upload(&member, 5, upload("notes.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(attachment.filename, "notes.txt");
        assert_eq!(storage.len().await, 1);
        assert_eq!(
            recorded.lock().unwrap()[0].action,
            ActivityAction::AttachmentAdded
        );
    }

    #[tokio::test]
    async fn test_blocked_type_never_reaches_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments.expect_create().never();
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        let err = service
            .upload(&member, 5, upload("setup.exe", b"MZ"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_executable_with_trailing_dot_or_space_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments.expect_create().never();
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        for name in ["setup.exe ", "setup.exe.", "setup.exe. "] {
            let err = service
                .upload(&member, 5, upload(name, b"MZ"))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 422, "{name:?} was accepted");
        }
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_overlong_filename_is_a_validation_error() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments.expect_create().never();
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        let name = format!("{}.txt", "n".repeat(300));
        let err = service
            .upload(&member, 5, upload(&name, b"hello"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_stores_normalized_filename() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments
            .expect_create()
            .withf(|new| new.filename == "notes.txt" && new.storage_key.ends_with("-notes.txt"))
            .times(1)
            .returning(|new| Ok(stored(new)));
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage,
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        let attachment = service
            .upload(&member, 5, upload(" notes.txt. ", b"hello"))
            .await
            .unwrap();
        assert_eq!(attachment.filename, "notes.txt");
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_file() {
        let storage = Arc::new(MemoryStorage::new());
        let mut attachments = MockAttachmentStore::new();
        attachments
            .expect_create()
            .returning(|_| Err(RepositoryError::Conflict("task is gone".into())));
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let member = user_with(2, &[(10, WorkspaceRole::Member)]);
        assert!(service
            .upload(&member, 5, upload("notes.txt", b"hello"))
            .await
            .is_err());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_download_and_delete() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put("tasks/5/abc-notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let mut attachments = MockAttachmentStore::new();
        attachments.expect_find_by_id().returning(|id| {
            Ok(Some(Attachment {
                id,
                ..stored(NewAttachment {
                    task_id: 5,
                    uploader_id: 2,
                    filename: "notes.txt".into(),
                    storage_key: "tasks/5/abc-notes.txt".into(),
                    content_type: "text/plain".into(),
                    file_size: 5,
                    digest: String::new(),
                })
            }))
        });
        attachments.expect_delete().times(1).returning(|_| Ok(()));
        let (activity, _) = recorded_activity();
        let service = AttachmentService::new(
            Arc::new(attachments),
            Arc::new(tasks()),
            storage.clone(),
            AllowedFileTypes::default(),
            activity,
        );

        let viewer = user_with(3, &[(10, WorkspaceRole::Viewer)]);
        let (_, data) = service.download(&viewer, 70).await.unwrap();
        assert_eq!(&data[..], b"hello");
        assert_eq!(service.delete(&viewer, 70).await.unwrap_err().status_code(), 403);

        let uploader = user_with(2, &[(10, WorkspaceRole::Member)]);
        service.delete(&uploader, 70).await.unwrap();
        assert!(storage.is_empty().await);
    }
}
