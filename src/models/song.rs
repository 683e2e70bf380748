use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ObjectUpload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    pub audio_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub audio_public_id: Option<String>,
    #[serde(default)]
    pub cover_public_id: Option<String>,
    /// Seconds, 0 when unknown.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub views: u64,
    // Signed: remote like counts are best-effort and may drift below zero
    #[serde(default)]
    pub likes: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Song {
    pub fn new(id: &str, title: &str, artist: &str, audio_url: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: String::new(),
            genre: String::new(),
            audio_url: audio_url.to_string(),
            cover_url: None,
            audio_public_id: None,
            cover_public_id: None,
            duration: 0,
            views: 0,
            likes: 0,
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.artist, &self.album]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Admin request to publish a song. Blank text fields are filled from the audio tags.
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub audio: ObjectUpload,
    pub cover: Option<ObjectUpload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.genre.is_none()
    }
}
