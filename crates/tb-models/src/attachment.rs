//! Attachment model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tb_core::{Entity, Id, Identifiable};

/// Metadata of a file attached to a task; the bytes live in storage
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Id,
    pub task_id: Id,
    pub uploader_id: Option<Id>,
    pub filename: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub content_type: String,
    pub file_size: i64,
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Size formatted for display, e.g. `1.5 MB`
    pub fn human_filesize(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.file_size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", self.file_size, UNITS[0])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

impl Identifiable for Attachment {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Attachment {
    const TABLE_NAME: &'static str = "attachments";
    const TYPE_NAME: &'static str = "Attachment";
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub task_id: Id,
    pub uploader_id: Id,
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size: i64,
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(size: i64) -> Attachment {
        Attachment {
            id: 1,
            task_id: 1,
            uploader_id: Some(1),
            filename: "mockup.png".into(),
            storage_key: "tasks/1/abc-mockup.png".into(),
            content_type: "image/png".into(),
            file_size: size,
            digest: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_human_filesize() {
        assert_eq!(attachment(512).human_filesize(), "512 B");
        assert_eq!(attachment(1536).human_filesize(), "1.5 KB");
        assert_eq!(attachment(5 * 1024 * 1024).human_filesize(), "5.0 MB");
    }

    #[test]
    fn test_storage_key_not_serialized() {
        let json = serde_json::to_value(attachment(1)).unwrap();
        assert!(json.get("storageKey").is_none());
        assert_eq!(json["contentType"], "image/png");
        assert!(attachment(1).is_image());
    }
}
