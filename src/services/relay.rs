use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::error::{AppError, Result};
use crate::models::{UploadRecord, UPLOADS};
use crate::store::{get_as, list_as, sanitize_folder, to_fields, DocumentStore, ObjectStorage, ObjectUpload};

/// Streams an uploaded file to object storage and records a pointer document.
/// No retry and no queueing: a failed upload is reported to the caller as is.
pub struct UploadRelay {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl UploadRelay {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    pub async fn relay(&self, upload: ObjectUpload) -> Result<UploadRecord> {
        if upload.data.is_empty() {
            return Err(AppError::MissingFile);
        }

        let folder = sanitize_folder(&upload.folder);
        let file_name = upload.file_name.clone();
        let content_type = upload.content_type_or_default();

        let stored = self.storage.upload(upload.in_folder(&folder)).await?;

        let mut record = UploadRecord {
            id: String::new(),
            public_id: stored.public_id,
            url: stored.url,
            file_name,
            content_type,
            kind: stored.kind,
            bytes: stored.bytes,
            folder,
            created_at: Utc::now(),
        };
        let mut fields = to_fields(&record)?;
        fields.remove("id");
        record.id = self.store.add(UPLOADS, fields).await?;

        info!("Relayed {} ({} bytes) -> {}", record.file_name, record.bytes, record.url);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<UploadRecord> {
        get_as(self.store.as_ref(), UPLOADS, id).await
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<UploadRecord>> {
        let mut records: Vec<UploadRecord> = list_as(self.store.as_ref(), UPLOADS).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
