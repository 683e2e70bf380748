use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub songs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(name: &str, owner: &str) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.to_string(),
            owner: owner.to_string(),
            songs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, song_id: &str) -> bool {
        self.songs.iter().any(|id| id == song_id)
    }
}
