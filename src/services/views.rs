use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, warn};

use crate::models::SONGS;
use crate::store::DocumentStore;

/// Session-local throttle for the remote `views` counter.
pub struct ViewTracker {
    store: Arc<dyn DocumentStore>,
    cooldown: chrono::Duration,
    last_counted: DashMap<String, DateTime<Utc>>,
}

impl ViewTracker {
    pub fn new(store: Arc<dyn DocumentStore>, cooldown: Duration) -> Self {
        Self {
            store,
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::hours(1)),
            last_counted: DashMap::new(),
        }
    }

    pub async fn record(&self, song_id: &str) -> bool {
        self.record_at(song_id, Utc::now()).await
    }

    /// Returns whether a view was counted. The remote increment is
    /// best-effort; a failure is logged and the gate still closes.
    pub async fn record_at(&self, song_id: &str, now: DateTime<Utc>) -> bool {
        if !self.try_open(song_id, now) {
            debug!("View for {} already counted within cooldown", song_id);
            return false;
        }

        if let Err(e) = self.store.increment(SONGS, song_id, "views", 1).await {
            warn!("Failed to increment views for {}: {}", song_id, e);
        }
        true
    }

    pub fn last_counted(&self, song_id: &str) -> Option<DateTime<Utc>> {
        self.last_counted.get(song_id).map(|entry| *entry)
    }

    fn try_open(&self, song_id: &str, now: DateTime<Utc>) -> bool {
        let mut entry = self.last_counted.entry(song_id.to_string()).or_insert(DateTime::<Utc>::MIN_UTC);
        if now.signed_duration_since(*entry) < self.cooldown {
            return false;
        }
        *entry = now;
        true
    }
}
