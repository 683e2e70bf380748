//! Capability interfaces for the managed services the app talks to, plus
//! the adapters the relay ships with.

pub mod document;
pub mod kv;
pub mod local_media;
pub mod media_host;
pub mod memory;
pub mod object;

pub use document::{get_as, list_as, to_fields, ChangeKind, Document, DocumentChange, DocumentStore, Fields};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use local_media::LocalObjectStorage;
pub use media_host::HttpMediaHost;
pub use memory::MemoryDocumentStore;
pub use object::{sanitize_folder, MediaKind, ObjectStorage, ObjectUpload, StoredObject};
