use std::sync::Arc;

use log::info;
use rocket::data::{Limits, ToByteUnit};
use rocket::{catchers, routes, Build, Rocket};

use crate::config::Config;
use crate::error::Result;
use crate::handlers;
use crate::services::UploadRelay;
use crate::store::{DocumentStore, HttpMediaHost, LocalObjectStorage, MemoryDocumentStore, ObjectStorage};

// Headroom for the multipart envelope around the file part
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Where relayed objects end up.
pub enum MediaBackend {
    Local(Arc<LocalObjectStorage>),
    Remote(Arc<HttpMediaHost>),
}

impl MediaBackend {
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.media_host_url {
            Some(endpoint) => {
                info!("Relaying uploads to media host at {}", endpoint);
                let host = HttpMediaHost::new(endpoint, config.media_upload_preset.clone())?;
                Ok(MediaBackend::Remote(Arc::new(host)))
            }
            None => {
                std::fs::create_dir_all(&config.media_dir)?;
                info!("Storing uploads under {}", config.media_dir.display());
                let local = LocalObjectStorage::new(&config.media_dir, &config.public_base_url);
                Ok(MediaBackend::Local(Arc::new(local)))
            }
        }
    }

    pub fn storage(&self) -> Arc<dyn ObjectStorage> {
        match self {
            MediaBackend::Local(local) => local.clone() as Arc<dyn ObjectStorage>,
            MediaBackend::Remote(remote) => remote.clone() as Arc<dyn ObjectStorage>,
        }
    }
}

/// Build the relay from environment-style configuration.
pub fn build_rocket(config: Config) -> Result<Rocket<Build>> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::open(&config.snapshot_file()));
    let media = MediaBackend::from_config(&config)?;
    Ok(build_rocket_with(config, store, media))
}

pub fn build_rocket_with(config: Config, store: Arc<dyn DocumentStore>, media: MediaBackend) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", config.max_upload_bytes.bytes())
        .limit("data-form", (config.max_upload_bytes + FORM_OVERHEAD_BYTES).bytes());

    let figment = rocket::Config::figment()
        .merge(("address", config.host.clone()))
        .merge(("port", config.port))
        .merge(("limits", limits));

    let relay = UploadRelay::new(store, media.storage());

    let rocket = rocket::custom(figment)
        .manage(relay)
        .mount("/", routes![
            handlers::health_check,
            handlers::upload,
            handlers::list_uploads,
            handlers::get_upload,
        ])
        .register("/", catchers![
            handlers::bad_request,
            handlers::not_found,
            handlers::payload_too_large,
            handlers::unprocessable,
            handlers::server_error,
        ]);

    let rocket = match media {
        MediaBackend::Local(local) => rocket.manage(local).mount("/", routes![handlers::media]),
        MediaBackend::Remote(_) => rocket,
    };

    rocket.manage(config)
}
