use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config;
use crate::error::{AppError, Result};
use crate::store::document::{ChangeKind, Document, DocumentChange, DocumentStore, Fields};

type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

/// In-process document store. With a snapshot path, every mutation is
/// written through to a JSON file that is reloaded on the next open.
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
    channels: DashMap<String, broadcast::Sender<DocumentChange>>,
    snapshot: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            channels: DashMap::new(),
            snapshot: None,
            persist_lock: Mutex::new(()),
        }
    }

    pub fn open(snapshot: &Path) -> Self {
        let collections = load_snapshot(snapshot);
        let count: usize = collections.values().map(|docs| docs.len()).sum();
        info!("Document store opened from {} ({} documents)", snapshot.display(), count);

        Self {
            collections: RwLock::new(collections),
            channels: DashMap::new(),
            snapshot: Some(snapshot.to_path_buf()),
            persist_lock: Mutex::new(()),
        }
    }

    fn sender(&self, collection: &str) -> broadcast::Sender<DocumentChange> {
        self.channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(config::EVENT_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn notify(&self, collection: &str, kind: ChangeKind, id: &str, data: Fields) {
        let change = DocumentChange {
            collection: collection.to_string(),
            kind,
            document: Document::new(id, data),
        };
        // No listeners is fine
        let _ = self.sender(collection).send(change);
    }

    // The in-memory state stays authoritative: a failed snapshot is logged and
    // retried implicitly by the next mutation.
    fn persist(&self) {
        let Some(path) = &self.snapshot else {
            return;
        };

        let _guard = self.persist_lock.lock();
        match self.write_snapshot(path) {
            Ok(()) => debug!("Document snapshot written to {}", path.display()),
            Err(e) => error!("Error saving document snapshot {}: {}", path.display(), e),
        }
    }

    fn write_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.collections.read())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Collections {
    if !path.exists() {
        return Collections::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(collections) => return collections,
            Err(e) => error!("Error parsing document snapshot {}: {}", path.display(), e),
        },
        Err(e) => error!("Error reading document snapshot {}: {}", path.display(), e),
    }

    warn!("Starting with an empty document store");
    Collections::new()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, data)| Document::new(id, data.clone())).collect())
            .unwrap_or_default())
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        let existed = {
            let mut collections = self.collections.write();
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), data.clone())
                .is_some()
        };

        self.persist();
        let kind = if existed { ChangeKind::Modified } else { ChangeKind::Added };
        self.notify(collection, kind, id, data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let merged = {
            let mut collections = self.collections.write();
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| AppError::not_found(collection, id))?;
            doc.extend(fields);
            doc.clone()
        };

        self.persist();
        self.notify(collection, ChangeKind::Modified, id, merged);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = {
            let mut collections = self.collections.write();
            collections.get_mut(collection).and_then(|docs| docs.remove(id))
        };

        if let Some(data) = removed {
            self.persist();
            self.notify(collection, ChangeKind::Removed, id, data);
        }
        Ok(())
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<()> {
        let updated = {
            let mut collections = self.collections.write();
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| AppError::not_found(collection, id))?;
            let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
            doc.insert(field.to_string(), Value::from(current.saturating_add(delta)));
            doc.clone()
        };

        self.persist();
        self.notify(collection, ChangeKind::Modified, id, updated);
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<DocumentChange> {
        self.sender(collection).subscribe()
    }
}
