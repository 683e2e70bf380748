// Library exports for the tunecloud crate
// The relay binary and the integration tests both build on this API

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{Playlist, Role, Session, Song, UploadRecord, UserProfile};
pub use server::{build_rocket, build_rocket_with, MediaBackend};
pub use services::{
    AdminSongs, AudioSink, Catalog, LikeSync, PlayMode, PlaybackController, PlaybackState, PlayerEvent,
    PlaylistService, UploadRelay, UserService, ViewTracker,
};
pub use store::{DocumentStore, KeyValueStore, ObjectStorage, ObjectUpload};
