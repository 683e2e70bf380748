use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{NewSong, Session, Song, SongPatch, SONGS};
use crate::services::playlists::PlaylistService;
use crate::services::users::require_admin;
use crate::store::{get_as, to_fields, DocumentStore, MediaKind, ObjectStorage, StoredObject};
use crate::utils::audio_probe::{probe_mp3, title_from_file_name};

const AUDIO_FOLDER: &str = "songs/audio";
const COVER_FOLDER: &str = "songs/covers";

/// Song publishing for admins: media upload, metadata and catalog writes.
pub struct AdminSongs {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    playlists: PlaylistService,
}

fn pick(given: &str, probed: Option<String>, fallback: &str) -> String {
    let given = given.trim();
    if !given.is_empty() {
        return given.to_string();
    }
    probed.unwrap_or_else(|| fallback.to_string())
}

impl AdminSongs {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            playlists: PlaylistService::new(store.clone()),
            store,
            storage,
        }
    }

    pub async fn create_song(&self, session: &Session, new_song: NewSong) -> Result<Song> {
        require_admin(session)?;

        let NewSong { title, artist, album, genre, audio, cover } = new_song;
        if audio.data.is_empty() {
            return Err(AppError::MissingFile);
        }
        if audio.kind() != MediaKind::Audio {
            return Err(AppError::Validation(format!("{} is not an audio file", audio.file_name)));
        }
        if let Some(cover) = &cover {
            if cover.kind() != MediaKind::Image {
                return Err(AppError::Validation(format!("{} is not an image", cover.file_name)));
            }
        }

        let tags = probe_mp3(&audio.file_name, &audio.data);
        let fallback_title = title_from_file_name(&audio.file_name);

        let stored_audio = self.storage.upload(audio.in_folder(AUDIO_FOLDER)).await?;
        let stored_cover = match cover {
            Some(cover) if !cover.data.is_empty() => {
                match self.storage.upload(cover.in_folder(COVER_FOLDER)).await {
                    Ok(stored) => Some(stored),
                    Err(e) => {
                        self.discard(&stored_audio).await;
                        return Err(e);
                    }
                }
            }
            _ => None,
        };

        let mut song = Song {
            id: String::new(),
            title: pick(&title, tags.title, &fallback_title),
            artist: pick(&artist, tags.artist, "Unknown"),
            album: pick(&album, tags.album, ""),
            genre: pick(&genre, tags.genre, ""),
            audio_url: stored_audio.url.clone(),
            cover_url: stored_cover.as_ref().map(|c| c.url.clone()),
            audio_public_id: Some(stored_audio.public_id.clone()),
            cover_public_id: stored_cover.as_ref().map(|c| c.public_id.clone()),
            duration: tags.duration,
            views: 0,
            likes: 0,
            created_at: Utc::now(),
        };

        let added = match to_fields(&song) {
            Ok(fields) => self.store.add(SONGS, fields).await,
            Err(e) => Err(e),
        };
        song.id = match added {
            Ok(id) => id,
            Err(e) => {
                self.discard(&stored_audio).await;
                if let Some(cover) = &stored_cover {
                    self.discard(cover).await;
                }
                return Err(e);
            }
        };
        info!("{} published \"{}\" by {} ({})", session.user_id, song.title, song.artist, song.id);
        Ok(song)
    }

    async fn discard(&self, object: &StoredObject) {
        if let Err(e) = self.storage.delete(&object.public_id, object.kind).await {
            warn!("Failed to clean up {}: {}", object.public_id, e);
        }
    }

    pub async fn update_song(&self, session: &Session, id: &str, patch: SongPatch) -> Result<Song> {
        require_admin(session)?;

        if patch.is_empty() {
            return get_as(self.store.as_ref(), SONGS, id).await;
        }
        for (field, value) in [("title", &patch.title), ("artist", &patch.artist)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(AppError::Validation(format!("{} cannot be empty", field)));
            }
        }

        let trimmed = SongPatch {
            title: patch.title.map(|v| v.trim().to_string()),
            artist: patch.artist.map(|v| v.trim().to_string()),
            album: patch.album.map(|v| v.trim().to_string()),
            genre: patch.genre.map(|v| v.trim().to_string()),
        };
        self.store.update(SONGS, id, to_fields(&trimmed)?).await?;
        get_as(self.store.as_ref(), SONGS, id).await
    }

    /// Remove the song document, its playlist references and (best-effort) its media.
    pub async fn delete_song(&self, session: &Session, id: &str) -> Result<()> {
        require_admin(session)?;

        let song: Song = get_as(self.store.as_ref(), SONGS, id).await?;
        self.store.delete(SONGS, id).await?;

        let touched = self.playlists.purge_song(id).await?;
        info!("{} deleted \"{}\" ({}), removed from {} playlists", session.user_id, song.title, id, touched);

        let media = [(song.audio_public_id, MediaKind::Audio), (song.cover_public_id, MediaKind::Image)];
        for (public_id, kind) in media.into_iter().filter_map(|(public_id, kind)| Some((public_id?, kind))) {
            if let Err(e) = self.storage.delete(&public_id, kind).await {
                warn!("Failed to delete media {} for song {}: {}", public_id, id, e);
            }
        }
        Ok(())
    }
}
