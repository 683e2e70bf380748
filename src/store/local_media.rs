use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::{info, warn};

use crate::error::{AppError, Result};
use crate::store::object::{sanitize_folder, MediaKind, ObjectStorage, ObjectUpload, StoredObject};

/// Stores objects under a local directory; the relay serves them at `/media/<public_id>`.
pub struct LocalObjectStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: &Path, base_url: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a public id back to a file, refusing anything that escapes the root.
    pub fn resolve(&self, public_id: &str) -> Option<PathBuf> {
        let relative = Path::new(public_id);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if !safe || public_id.is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, upload: ObjectUpload) -> Result<StoredObject> {
        let folder = sanitize_folder(&upload.folder);
        let public_id = format!("{}/{}.{}", folder, uuid::Uuid::new_v4().simple(), upload.extension());
        let path = self.root.join(&public_id);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &upload.data).await?;

        info!("Stored {} ({} bytes) as {}", upload.file_name, upload.data.len(), public_id);

        Ok(StoredObject {
            url: format!("{}/media/{}", self.base_url, public_id),
            bytes: upload.data.len() as u64,
            kind: upload.kind(),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str, _kind: MediaKind) -> Result<()> {
        let path = self
            .resolve(public_id)
            .ok_or_else(|| AppError::Validation(format!("invalid public id {:?}", public_id)))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object already gone: {}", public_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
