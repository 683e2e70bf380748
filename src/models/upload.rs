use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::MediaKind;

/// Pointer document written by the upload relay for every stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    #[serde(default)]
    pub id: String,
    pub public_id: String,
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    /// Resource kind the object was stored as; needed to delete it again.
    #[serde(default)]
    pub kind: MediaKind,
    pub bytes: u64,
    pub folder: String,
    pub created_at: DateTime<Utc>,
}
