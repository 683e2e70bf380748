use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lazy_static::lazy_static;

lazy_static! {
    // Base directory
    pub static ref BASE_DIR: PathBuf = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Document snapshot + local key/value files
    pub static ref DATA_DIR: PathBuf = BASE_DIR.join("data");

    // Locally hosted media objects
    pub static ref MEDIA_DIR: PathBuf = BASE_DIR.join("media");
}

// Server configuration
pub const PORT: u16 = 8000;
pub const HOST: &str = "0.0.0.0";

// Upload relay
pub const MAX_UPLOAD_MB: u64 = 50;
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";
pub const DOCUMENT_SNAPSHOT_FILE: &str = "documents.json";

// Playback
pub const VIEW_COOLDOWN_SECS: u64 = 3600; // One counted view per track per hour
pub const RESTART_THRESHOLD_SECS: u64 = 3; // "previous" restarts the track past this point
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// Playlists
pub const MAX_PLAYLIST_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
    pub public_base_url: String,
    /// Remote media host endpoint. Objects are stored under `media_dir` when unset.
    pub media_host_url: Option<String>,
    pub media_upload_preset: Option<String>,
    pub max_upload_bytes: u64,
    pub view_cooldown: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            data_dir: DATA_DIR.clone(),
            media_dir: MEDIA_DIR.clone(),
            public_base_url: format!("http://localhost:{}", PORT),
            media_host_url: None,
            media_upload_preset: None,
            max_upload_bytes: MAX_UPLOAD_MB * 1024 * 1024,
            view_cooldown: Duration::from_secs(VIEW_COOLDOWN_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = parse_var("PORT", defaults.port);

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            media_dir: env::var("MEDIA_DIR").map(PathBuf::from).unwrap_or(defaults.media_dir),
            public_base_url,
            media_host_url: non_empty_var("MEDIA_HOST_URL"),
            media_upload_preset: non_empty_var("MEDIA_UPLOAD_PRESET"),
            max_upload_bytes: parse_var("MAX_UPLOAD_MB", MAX_UPLOAD_MB) * 1024 * 1024,
            view_cooldown: Duration::from_secs(parse_var("VIEW_COOLDOWN_SECS", VIEW_COOLDOWN_SECS)),
        }
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.data_dir.join(DOCUMENT_SNAPSHOT_FILE)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}
