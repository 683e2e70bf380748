use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::{Playlist, Session, PLAYLISTS, SONGS};
use crate::store::{get_as, list_as, to_fields, DocumentStore};

pub struct PlaylistService {
    store: Arc<dyn DocumentStore>,
}

pub fn validate_playlist_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("playlist name cannot be empty".to_string()));
    }
    if name.chars().count() > config::MAX_PLAYLIST_NAME_LEN {
        return Err(AppError::Validation(format!(
            "playlist name is longer than {} characters",
            config::MAX_PLAYLIST_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

impl PlaylistService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, session: &Session, name: &str) -> Result<Playlist> {
        let name = validate_playlist_name(name)?;
        let mut playlist = Playlist::new(&name, &session.user_id);
        playlist.id = self.store.add(PLAYLISTS, to_fields(&playlist)?).await?;

        info!("Created playlist \"{}\" ({}) for {}", playlist.name, playlist.id, session.user_id);
        Ok(playlist)
    }

    pub async fn get(&self, id: &str) -> Result<Playlist> {
        get_as(self.store.as_ref(), PLAYLISTS, id).await
    }

    /// Playlists owned by `user_id`, most recently updated first.
    pub async fn list_for(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let mut playlists: Vec<Playlist> = list_as(self.store.as_ref(), PLAYLISTS).await?;
        playlists.retain(|p| p.owner == user_id);
        playlists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(playlists)
    }

    async fn owned(&self, session: &Session, id: &str) -> Result<Playlist> {
        let playlist = self.get(id).await?;
        if playlist.owner != session.user_id {
            return Err(AppError::PermissionDenied(format!(
                "playlist {} belongs to another user",
                id
            )));
        }
        Ok(playlist)
    }

    async fn save(&self, mut playlist: Playlist) -> Result<Playlist> {
        playlist.updated_at = Utc::now();
        self.store.set(PLAYLISTS, &playlist.id, to_fields(&playlist)?).await?;
        Ok(playlist)
    }

    pub async fn rename(&self, session: &Session, id: &str, name: &str) -> Result<Playlist> {
        let name = validate_playlist_name(name)?;
        let mut playlist = self.owned(session, id).await?;
        playlist.name = name;
        self.save(playlist).await
    }

    pub async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        self.owned(session, id).await?;
        self.store.delete(PLAYLISTS, id).await?;
        info!("Deleted playlist {}", id);
        Ok(())
    }

    /// Appends the song; adding a song already present is a no-op.
    pub async fn add_song(&self, session: &Session, id: &str, song_id: &str) -> Result<Playlist> {
        let mut playlist = self.owned(session, id).await?;
        if playlist.contains(song_id) {
            return Ok(playlist);
        }
        if self.store.get(SONGS, song_id).await?.is_none() {
            return Err(AppError::not_found(SONGS, song_id));
        }

        playlist.songs.push(song_id.to_string());
        self.save(playlist).await
    }

    pub async fn remove_song(&self, session: &Session, id: &str, song_id: &str) -> Result<Playlist> {
        let mut playlist = self.owned(session, id).await?;
        let before = playlist.songs.len();
        playlist.songs.retain(|s| s != song_id);
        if playlist.songs.len() == before {
            return Ok(playlist);
        }
        self.save(playlist).await
    }

    /// Drop a song from every playlist that references it. Returns how many changed.
    pub async fn purge_song(&self, song_id: &str) -> Result<usize> {
        let playlists: Vec<Playlist> = list_as(self.store.as_ref(), PLAYLISTS).await?;
        let mut changed = 0;
        for mut playlist in playlists.into_iter().filter(|p| p.contains(song_id)) {
            playlist.songs.retain(|s| s != song_id);
            self.save(playlist).await?;
            changed += 1;
        }
        Ok(changed)
    }
}
