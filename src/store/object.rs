use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ObjectUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub folder: String,
    pub data: Bytes,
}

impl ObjectUpload {
    pub fn new(file_name: &str, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            folder: config::DEFAULT_UPLOAD_FOLDER.to_string(),
            data: data.into(),
        }
    }

    pub fn in_folder(mut self, folder: &str) -> Self {
        self.folder = folder.to_string();
        self
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::detect(self.content_type.as_deref(), &self.file_name)
    }

    /// Lowercase extension from the file name, falling back to the content type.
    pub fn extension(&self) -> String {
        let from_name = Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

        from_name.unwrap_or_else(|| {
            match self.content_type.as_deref() {
                Some("audio/mpeg") | Some("audio/mp3") => "mp3",
                Some("audio/wav") | Some("audio/x-wav") => "wav",
                Some("audio/ogg") => "ogg",
                Some("audio/flac") => "flac",
                Some("audio/mp4") | Some("audio/x-m4a") => "m4a",
                Some("image/jpeg") => "jpg",
                Some("image/png") => "png",
                Some("image/webp") => "webp",
                _ => "bin",
            }
            .to_string()
        })
    }

    pub fn content_type_or_default(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    #[default]
    Raw,
}

impl MediaKind {
    pub fn detect(content_type: Option<&str>, file_name: &str) -> Self {
        if let Some(ct) = content_type {
            if ct.starts_with("audio/") {
                return MediaKind::Audio;
            }
            if ct.starts_with("image/") {
                return MediaKind::Image;
            }
        }

        let ext = Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" | "wav" | "m4a" | "aac" | "ogg" | "flac" | "opus" => MediaKind::Audio,
            "jpg" | "jpeg" | "png" | "webp" | "gif" => MediaKind::Image,
            _ => MediaKind::Raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub public_id: String,
    pub url: String,
    pub bytes: u64,
    pub kind: MediaKind,
}

/// Binary object upload returning a stable URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, upload: ObjectUpload) -> Result<StoredObject>;

    /// Hosted public ids carry no extension, so the caller names the kind it uploaded.
    async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<()>;
}

/// Folder names become path segments; keep them to a safe alphabet.
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .trim()
        .trim_matches('/')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        .collect();

    let segments: Vec<&str> = cleaned.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        config::DEFAULT_UPLOAD_FOLDER.to_string()
    } else {
        segments.join("/")
    }
}
