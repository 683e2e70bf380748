//! Playback and queue state.
//!
//! `PlaybackController` owns the current queue, index, position and the
//! repeat/shuffle flags, and drives an [`AudioSink`] through the
//! `Idle -> Loading -> Playing <-> Paused` lifecycle. Each track load records a
//! throttled view; like toggles go through [`LikeSync`]. Remote failures on
//! either path are logged and never interrupt playback.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config;
use crate::error::{AppError, Result};
use crate::models::Song;
use crate::services::likes::LikeSync;
use crate::services::views::ViewTracker;

/// Audio output capability. Calls are synchronous commands to the device.
pub trait AudioSink: Send + Sync {
    fn load(&self, url: &str) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn seek(&self, position: Duration) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    #[default]
    Sequential,
    Random,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlaybackState),
    TrackChanged { index: usize, song_id: String },
    Seeked(Duration),
    QueueFinished,
    LikeChanged { song_id: String, liked: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub queue: Vec<Song>,
    pub index: Option<usize>,
    pub position: Duration,
    pub repeat: bool,
    pub mode: PlayMode,
}

struct PlayerInner {
    state: PlaybackState,
    queue: Vec<Song>,
    index: Option<usize>,
    position: Duration,
    repeat: bool,
    mode: PlayMode,
    rng: StdRng,
}

impl PlayerInner {
    fn current(&self) -> Option<&Song> {
        self.index.and_then(|i| self.queue.get(i))
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.current() {
            Some(song) if song.duration > 0 => position.min(Duration::from_secs(song.duration)),
            _ => position,
        }
    }

    fn random_index(&mut self) -> usize {
        let len = self.queue.len();
        self.rng.gen_range(0..len)
    }
}

pub struct PlaybackController {
    inner: Mutex<PlayerInner>,
    sink: Arc<dyn AudioSink>,
    views: ViewTracker,
    likes: Arc<LikeSync>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlaybackController {
    pub fn new(sink: Arc<dyn AudioSink>, views: ViewTracker, likes: Arc<LikeSync>) -> Self {
        Self::with_rng(sink, views, likes, StdRng::from_entropy())
    }

    /// Deterministic random mode for replays and tests.
    pub fn with_seed(sink: Arc<dyn AudioSink>, views: ViewTracker, likes: Arc<LikeSync>, seed: u64) -> Self {
        Self::with_rng(sink, views, likes, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sink: Arc<dyn AudioSink>, views: ViewTracker, likes: Arc<LikeSync>, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(config::EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(PlayerInner {
                state: PlaybackState::Idle,
                queue: Vec::new(),
                index: None,
                position: Duration::ZERO,
                repeat: false,
                mode: PlayMode::Sequential,
                rng,
            }),
            sink,
            views,
            likes,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let inner = self.inner.lock();
        PlayerSnapshot {
            state: inner.state,
            queue: inner.queue.clone(),
            index: inner.index,
            position: inner.position,
            repeat: inner.repeat,
            mode: inner.mode,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state
    }

    pub fn current_song(&self) -> Option<Song> {
        self.inner.lock().current().cloned()
    }

    fn emit(&self, event: PlayerEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: PlaybackState) {
        let changed = {
            let mut inner = self.inner.lock();
            let changed = inner.state != state;
            inner.state = state;
            changed
        };
        if changed {
            self.emit(PlayerEvent::StateChanged(state));
        }
    }

    /// Replace the queue and start playing `index`.
    pub async fn play(&self, queue: Vec<Song>, index: usize) -> Result<()> {
        if queue.is_empty() {
            return Err(AppError::EmptyQueue);
        }
        if index >= queue.len() {
            return Err(AppError::InvalidIndex { index, len: queue.len() });
        }

        info!("Playing queue of {} tracks from index {}", queue.len(), index);
        self.inner.lock().queue = queue;
        self.start(index).await
    }

    async fn start(&self, index: usize) -> Result<()> {
        let song = {
            let mut inner = self.inner.lock();
            let len = inner.queue.len();
            let song = inner
                .queue
                .get(index)
                .cloned()
                .ok_or(AppError::InvalidIndex { index, len })?;
            inner.index = Some(index);
            inner.position = Duration::ZERO;
            song
        };
        self.set_state(PlaybackState::Loading);

        if let Err(e) = self.sink.load(&song.audio_url).and_then(|_| self.sink.play()) {
            error!("Failed to start \"{}\" ({}): {}", song.title, song.id, e);
            self.set_state(PlaybackState::Idle);
            return Err(e);
        }

        self.set_state(PlaybackState::Playing);
        self.emit(PlayerEvent::TrackChanged { index, song_id: song.id.clone() });
        info!("Now playing \"{}\" by {} (index {})", song.title, song.artist, index);

        self.views.record(&song.id).await;
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        if self.state() != PlaybackState::Playing {
            return Ok(());
        }
        self.sink.pause()?;
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        if self.state() != PlaybackState::Paused {
            return Ok(());
        }
        self.sink.play()?;
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    pub fn toggle(&self) -> Result<()> {
        match self.state() {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle | PlaybackState::Loading => Ok(()),
        }
    }

    /// Move within the loaded track. The playback state is left untouched.
    pub fn seek(&self, position: Duration) -> Result<()> {
        let position = {
            let inner = self.inner.lock();
            if inner.state == PlaybackState::Idle || inner.current().is_none() {
                return Err(AppError::NoTrack);
            }
            inner.clamp(position)
        };

        self.sink.seek(position)?;
        self.inner.lock().position = position;
        self.emit(PlayerEvent::Seeked(position));
        Ok(())
    }

    /// Progress callback from the sink.
    pub fn update_position(&self, position: Duration) {
        let mut inner = self.inner.lock();
        inner.position = inner.clamp(position);
    }

    /// Called by the sink when the current track finishes. Only a playing
    /// track can end; late callbacks after `stop` or a finished queue are ignored.
    pub async fn on_track_end(&self) -> Result<()> {
        let next = {
            let mut inner = self.inner.lock();
            if inner.state != PlaybackState::Playing {
                debug!("Ignoring track end while {:?}", inner.state);
                return Ok(());
            }
            let Some(index) = inner.index else {
                return Ok(());
            };

            if inner.repeat {
                Some(index)
            } else {
                match inner.mode {
                    PlayMode::Sequential if index + 1 < inner.queue.len() => Some(index + 1),
                    PlayMode::Sequential => None,
                    PlayMode::Random => Some(inner.random_index()),
                }
            }
        };

        match next {
            Some(index) => self.start(index).await,
            None => {
                debug!("Reached end of queue");
                if let Err(e) = self.sink.stop() {
                    warn!("Audio sink failed to stop: {}", e);
                }
                self.inner.lock().position = Duration::ZERO;
                self.set_state(PlaybackState::Idle);
                self.emit(PlayerEvent::QueueFinished);
                Ok(())
            }
        }
    }

    /// Manual skip. Wraps around in sequential mode; ignores repeat.
    pub async fn next(&self) -> Result<()> {
        let next = {
            let mut inner = self.inner.lock();
            let len = inner.queue.len();
            if len == 0 {
                return Err(AppError::EmptyQueue);
            }
            match (inner.mode, inner.index) {
                (PlayMode::Random, _) => inner.random_index(),
                (PlayMode::Sequential, Some(index)) => (index + 1) % len,
                (PlayMode::Sequential, None) => 0,
            }
        };
        self.start(next).await
    }

    /// Restart the track once it has played a few seconds, otherwise step back.
    pub async fn previous(&self) -> Result<()> {
        let previous = {
            let inner = self.inner.lock();
            let len = inner.queue.len();
            if len == 0 {
                return Err(AppError::EmptyQueue);
            }
            let restart = inner.state != PlaybackState::Idle
                && inner.position > Duration::from_secs(config::RESTART_THRESHOLD_SECS);
            match inner.index {
                Some(_) if restart => None,
                Some(index) => Some((index + len - 1) % len),
                None => Some(0),
            }
        };

        match previous {
            Some(index) => self.start(index).await,
            None => self.seek(Duration::ZERO),
        }
    }

    pub fn stop(&self) -> Result<()> {
        self.sink.stop()?;
        self.inner.lock().position = Duration::ZERO;
        self.set_state(PlaybackState::Idle);
        Ok(())
    }

    pub fn set_repeat(&self, repeat: bool) {
        self.inner.lock().repeat = repeat;
    }

    pub fn toggle_repeat(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.repeat = !inner.repeat;
        inner.repeat
    }

    pub fn set_mode(&self, mode: PlayMode) {
        self.inner.lock().mode = mode;
    }

    pub fn toggle_shuffle(&self) -> PlayMode {
        let mut inner = self.inner.lock();
        inner.mode = match inner.mode {
            PlayMode::Sequential => PlayMode::Random,
            PlayMode::Random => PlayMode::Sequential,
        };
        inner.mode
    }

    pub fn is_liked(&self, song_id: &str) -> bool {
        self.likes.is_liked(song_id)
    }

    /// Like or unlike the current track.
    pub async fn toggle_like(&self) -> Result<bool> {
        let song = self.current_song().ok_or(AppError::NoTrack)?;
        self.toggle_like_song(&song.id).await
    }

    pub async fn toggle_like_song(&self, song_id: &str) -> Result<bool> {
        let liked = self.likes.toggle(song_id).await?;
        self.emit(PlayerEvent::LikeChanged { song_id: song_id.to_string(), liked });
        Ok(liked)
    }
}
