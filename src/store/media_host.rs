use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::store::object::{sanitize_folder, MediaKind, ObjectStorage, ObjectUpload, StoredObject};

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
}

/// Client for a hosted media service that takes unsigned multipart uploads at
/// `{endpoint}/{resource_type}/upload` and answers with the stored object's URL.
pub struct HttpMediaHost {
    client: Client,
    endpoint: String,
    upload_preset: Option<String>,
}

impl HttpMediaHost {
    pub fn new(endpoint: &str, upload_preset: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            upload_preset,
        })
    }

    // Audio lives under the host's "video" resource type
    fn resource_type(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Audio => "video",
            MediaKind::Image => "image",
            MediaKind::Raw => "raw",
        }
    }

    fn action_url(&self, kind: MediaKind, action: &str) -> String {
        format!("{}/{}/{}", self.endpoint, Self::resource_type(kind), action)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(AppError::MediaHost { status: status.as_u16(), message })
    }
}

#[async_trait]
impl ObjectStorage for HttpMediaHost {
    async fn upload(&self, upload: ObjectUpload) -> Result<StoredObject> {
        let kind = upload.kind();
        let size = upload.data.len() as u64;

        // Bytes clones share the buffer, so the upload is held once
        let part = Part::stream_with_length(upload.data.clone(), size)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type_or_default())?;

        let mut form = Form::new()
            .part("file", part)
            .text("folder", sanitize_folder(&upload.folder));
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let url = self.action_url(kind, "upload");
        info!("Uploading {} ({} bytes) to {}", upload.file_name, size, url);

        let response = self.client.post(&url).multipart(form).send().await?;
        let body: UploadResponse = Self::check(response).await?.json().await?;

        let url = body.secure_url.or(body.url).ok_or_else(|| AppError::MediaHost {
            status: 200,
            message: format!("no URL returned for {}", body.public_id),
        })?;

        Ok(StoredObject {
            public_id: body.public_id,
            url,
            bytes: body.bytes.unwrap_or(size),
            kind,
        })
    }

    async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<()> {
        let mut params = vec![("public_id", public_id.to_string())];
        if let Some(preset) = &self.upload_preset {
            params.push(("upload_preset", preset.clone()));
        }

        let response = self
            .client
            .post(self.action_url(kind, "destroy"))
            .form(&params)
            .send()
            .await?;

        if let Err(e) = Self::check(response).await {
            warn!("Media host refused to delete {}: {}", public_id, e);
            return Err(e);
        }
        Ok(())
    }
}
