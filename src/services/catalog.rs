use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::error::Result;
use crate::models::{Song, SONGS};
use crate::store::{get_as, list_as, DocumentChange, DocumentStore};

/// Read side of the song catalog: listing, search, trending and live updates.
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Song>> {
        let mut songs: Vec<Song> = list_as(self.store.as_ref(), SONGS).await?;
        songs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.title.cmp(&b.title)));
        Ok(songs)
    }

    pub async fn get(&self, id: &str) -> Result<Song> {
        get_as(self.store.as_ref(), SONGS, id).await
    }

    /// Case-insensitive match on title, artist or album. Blank queries match everything.
    pub async fn search(&self, query: &str) -> Result<Vec<Song>> {
        let needle = query.trim().to_lowercase();
        let songs = self.list().await?;
        if needle.is_empty() {
            return Ok(songs);
        }
        Ok(songs.into_iter().filter(|song| song.matches(&needle)).collect())
    }

    pub async fn by_artist(&self, artist: &str) -> Result<Vec<Song>> {
        let artist = artist.trim().to_lowercase();
        let mut songs: Vec<Song> = list_as(self.store.as_ref(), SONGS).await?;
        songs.retain(|song| song.artist.to_lowercase() == artist);
        songs.sort_by(|a, b| a.album.cmp(&b.album).then_with(|| a.title.cmp(&b.title)));
        Ok(songs)
    }

    /// Most viewed first, likes break ties.
    pub async fn trending(&self, limit: usize) -> Result<Vec<Song>> {
        let mut songs: Vec<Song> = list_as(self.store.as_ref(), SONGS).await?;
        songs.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| b.likes.cmp(&a.likes)));
        songs.truncate(limit);
        Ok(songs)
    }

    /// Live change feed for the songs collection. Lagged receivers skip ahead.
    pub fn watch(&self) -> impl Stream<Item = DocumentChange> + Send + 'static {
        BroadcastStream::new(self.store.subscribe(SONGS)).filter_map(|change| async move {
            match change {
                Ok(change) => Some(change),
                Err(e) => {
                    log::warn!("Catalog watcher lagged: {}", e);
                    None
                }
            }
        })
    }
}
