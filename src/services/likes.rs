use std::collections::BTreeSet;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::{UserProfile, SONGS, USERS};
use crate::store::{DocumentStore, Fields, KeyValueStore};

/// Liked-song set for one user, kept on device and mirrored to the remote store.
pub struct LikeSync {
    store: Arc<dyn DocumentStore>,
    local: Arc<dyn KeyValueStore>,
    user_id: String,
    liked: RwLock<BTreeSet<String>>,
}

impl LikeSync {
    pub fn new(store: Arc<dyn DocumentStore>, local: Arc<dyn KeyValueStore>, user_id: &str) -> Self {
        Self {
            store,
            local,
            user_id: user_id.to_string(),
            liked: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn storage_key(user_id: &str) -> String {
        format!("liked_songs:{}", user_id)
    }

    /// Load from device storage, hydrating from the user profile on first run.
    pub async fn load(&self) -> Result<usize> {
        let key = Self::storage_key(&self.user_id);

        let set = match self.local.get(&key)? {
            Some(raw) => match serde_json::from_str::<BTreeSet<String>>(&raw) {
                Ok(set) => set,
                Err(e) => {
                    warn!("Discarding unreadable liked songs for {}: {}", self.user_id, e);
                    self.fetch_remote().await
                }
            },
            None => self.fetch_remote().await,
        };

        let count = set.len();
        self.local.set(&key, &serde_json::to_string(&set)?)?;
        *self.liked.write() = set;

        info!("Loaded {} liked songs for {}", count, self.user_id);
        Ok(count)
    }

    async fn fetch_remote(&self) -> BTreeSet<String> {
        match self.store.get(USERS, &self.user_id).await {
            Ok(Some(doc)) => match doc.decode::<UserProfile>() {
                Ok(profile) => profile.liked_songs.into_iter().collect(),
                Err(e) => {
                    warn!("Malformed profile for {}: {}", self.user_id, e);
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!("Failed to fetch liked songs for {}: {}", self.user_id, e);
                BTreeSet::new()
            }
        }
    }

    pub fn is_liked(&self, song_id: &str) -> bool {
        self.liked.read().contains(song_id)
    }

    pub fn liked(&self) -> Vec<String> {
        self.liked.read().iter().cloned().collect()
    }

    /// Flip the like state and return the new value. Device storage is written
    /// before the in-memory set changes, so a failed write leaves both as they
    /// were. Remote writes are best-effort and never rolled back, so the remote
    /// count can drift from the local set.
    pub async fn toggle(&self, song_id: &str) -> Result<bool> {
        let (now_liked, snapshot) = {
            let mut liked = self.liked.write();
            let mut next = liked.clone();
            let now_liked = if next.remove(song_id) {
                false
            } else {
                next.insert(song_id.to_string());
                true
            };

            self.local
                .set(&Self::storage_key(&self.user_id), &serde_json::to_string(&next)?)?;

            let snapshot = next.iter().cloned().collect::<Vec<_>>();
            *liked = next;
            (now_liked, snapshot)
        };

        let delta = if now_liked { 1 } else { -1 };
        if let Err(e) = self.store.increment(SONGS, song_id, "likes", delta).await {
            warn!("Failed to update like count for {}: {}", song_id, e);
        }

        let mut fields = Fields::new();
        fields.insert("likedSongs".to_string(), json!(snapshot));
        if let Err(e) = self.write_profile(fields).await {
            warn!("Failed to sync liked songs for {}: {}", self.user_id, e);
        }

        Ok(now_liked)
    }

    async fn write_profile(&self, fields: Fields) -> Result<()> {
        if self.store.get(USERS, &self.user_id).await?.is_some() {
            self.store.update(USERS, &self.user_id, fields).await
        } else {
            let mut data = fields;
            data.insert("role".to_string(), Value::from("user"));
            self.store.set(USERS, &self.user_id, data).await
        }
    }
}
