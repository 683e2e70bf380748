// Playback/queue state tests
// Drive the controller through a recording audio sink and an in-memory store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use tunecloud::models::{UserProfile, SONGS, USERS};
use tunecloud::store::{
    get_as, to_fields, DocumentChange, DocumentStore, Fields, KeyValueStore, MemoryDocumentStore,
    MemoryKeyValueStore,
};
use tunecloud::{
    AppError, AudioSink, LikeSync, PlayMode, PlaybackController, PlaybackState, PlayerEvent, Result, Song,
    ViewTracker,
};

#[derive(Default)]
struct RecordingSink {
    commands: Mutex<Vec<String>>,
    fail_load: AtomicBool,
}

impl RecordingSink {
    fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl AudioSink for RecordingSink {
    fn load(&self, url: &str) -> Result<()> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(AppError::Playback(format!("cannot open {}", url)));
        }
        self.commands.lock().push(format!("load {}", url));
        Ok(())
    }

    fn play(&self) -> Result<()> {
        self.commands.lock().push("play".to_string());
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.commands.lock().push("pause".to_string());
        Ok(())
    }

    fn seek(&self, position: Duration) -> Result<()> {
        self.commands.lock().push(format!("seek {}", position.as_secs()));
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.commands.lock().push("stop".to_string());
        Ok(())
    }
}

/// Delegates to a memory store but every increment fails, like a flaky network.
struct FlakyStore {
    inner: MemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<tunecloud::store::Document>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<tunecloud::store::Document>> {
        self.inner.list(collection).await
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String> {
        self.inner.add(collection, data).await
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        self.inner.set(collection, id, data).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await
    }

    async fn increment(&self, _collection: &str, _id: &str, _field: &str, _delta: i64) -> Result<()> {
        Err(AppError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "network down")))
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<DocumentChange> {
        self.inner.subscribe(collection)
    }
}

/// Device storage that reads fine but refuses every write.
#[derive(Default)]
struct FullDiskKeyValueStore {
    inner: MemoryKeyValueStore,
}

impl KeyValueStore for FullDiskKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

fn song(index: usize) -> Song {
    let mut song = Song::new(
        &format!("s{}", index),
        &format!("Track {}", index),
        "Test Artist",
        &format!("https://cdn.test/s{}.mp3", index),
    );
    song.duration = 200;
    song
}

fn queue() -> Vec<Song> {
    (0..3).map(song).collect()
}

async fn seed(store: &dyn DocumentStore) {
    for s in queue() {
        store.set(SONGS, &s.id, to_fields(&s).unwrap()).await.unwrap();
    }
}

struct Harness {
    sink: Arc<RecordingSink>,
    store: Arc<dyn DocumentStore>,
    local: Arc<MemoryKeyValueStore>,
    player: PlaybackController,
}

async fn harness_with(store: Arc<dyn DocumentStore>) -> Harness {
    seed(store.as_ref()).await;
    let sink = Arc::new(RecordingSink::default());
    let local = Arc::new(MemoryKeyValueStore::new());
    let views = ViewTracker::new(store.clone(), Duration::from_secs(3600));
    let likes = Arc::new(LikeSync::new(store.clone(), local.clone(), "u1"));
    likes.load().await.unwrap();

    let player = PlaybackController::with_seed(sink.clone(), views, likes, 7);
    Harness { sink, store, local, player }
}

async fn harness() -> Harness {
    harness_with(Arc::new(MemoryDocumentStore::new())).await
}

async fn stored_song(store: &dyn DocumentStore, id: &str) -> Song {
    get_as(store, SONGS, id).await.unwrap()
}

#[tokio::test]
async fn test_play_loads_track_and_counts_view() {
    let h = harness().await;
    let mut events = h.player.subscribe();

    h.player.play(queue(), 1).await.unwrap();

    let snapshot = h.player.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.index, Some(1));
    assert_eq!(snapshot.position, Duration::ZERO);
    assert_eq!(h.sink.commands(), vec!["load https://cdn.test/s1.mp3", "play"]);
    assert_eq!(stored_song(h.store.as_ref(), "s1").await.views, 1);

    assert_eq!(events.try_recv().unwrap(), PlayerEvent::StateChanged(PlaybackState::Loading));
    assert_eq!(events.try_recv().unwrap(), PlayerEvent::StateChanged(PlaybackState::Playing));
    assert_eq!(
        events.try_recv().unwrap(),
        PlayerEvent::TrackChanged { index: 1, song_id: "s1".to_string() }
    );
}

#[tokio::test]
async fn test_play_rejects_bad_queue() {
    let h = harness().await;

    assert!(matches!(h.player.play(Vec::new(), 0).await, Err(AppError::EmptyQueue)));
    assert!(matches!(
        h.player.play(queue(), 3).await,
        Err(AppError::InvalidIndex { index: 3, len: 3 })
    ));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert!(h.sink.commands().is_empty());
}

#[tokio::test]
async fn test_load_failure_returns_to_idle() {
    let h = harness().await;
    h.sink.fail_load.store(true, Ordering::SeqCst);

    let result = h.player.play(queue(), 0).await;
    assert!(matches!(result, Err(AppError::Playback(_))));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(stored_song(h.store.as_ref(), "s0").await.views, 0);
}

#[tokio::test]
async fn test_pause_resume_toggle() {
    let h = harness().await;

    // Nothing loaded: no-ops
    h.player.pause().unwrap();
    h.player.toggle().unwrap();
    assert_eq!(h.player.state(), PlaybackState::Idle);

    h.player.play(queue(), 0).await.unwrap();
    h.sink.clear();

    h.player.pause().unwrap();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    h.player.pause().unwrap();

    h.player.toggle().unwrap();
    assert_eq!(h.player.state(), PlaybackState::Playing);
    h.player.resume().unwrap();

    assert_eq!(h.sink.commands(), vec!["pause", "play"]);
}

#[tokio::test]
async fn test_seek_keeps_state_and_clamps() {
    let h = harness().await;
    assert!(matches!(h.player.seek(Duration::from_secs(5)), Err(AppError::NoTrack)));

    h.player.play(queue(), 0).await.unwrap();
    h.player.pause().unwrap();

    h.player.seek(Duration::from_secs(42)).unwrap();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert_eq!(h.player.snapshot().position, Duration::from_secs(42));

    h.player.seek(Duration::from_secs(900)).unwrap();
    assert_eq!(h.player.snapshot().position, Duration::from_secs(200));
}

#[tokio::test]
async fn test_sequential_advance_stops_at_end() {
    let h = harness().await;
    let mut events = h.player.subscribe();
    h.player.play(queue(), 1).await.unwrap();

    h.player.on_track_end().await.unwrap();
    assert_eq!(h.player.snapshot().index, Some(2));
    assert_eq!(h.player.state(), PlaybackState::Playing);

    h.player.on_track_end().await.unwrap();
    let snapshot = h.player.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.index, Some(2));
    assert_eq!(snapshot.queue.len(), 3);
    assert_eq!(h.sink.commands().last().map(String::as_str), Some("stop"));

    let mut finished = false;
    while let Ok(event) = events.try_recv() {
        finished |= event == PlayerEvent::QueueFinished;
    }
    assert!(finished);
}

#[tokio::test]
async fn test_repeat_loops_without_recounting_view() {
    let h = harness().await;
    h.player.set_repeat(true);
    h.player.play(queue(), 0).await.unwrap();

    h.player.on_track_end().await.unwrap();
    h.player.on_track_end().await.unwrap();

    assert_eq!(h.player.snapshot().index, Some(0));
    assert_eq!(h.player.state(), PlaybackState::Playing);
    let loads = h.sink.commands().iter().filter(|c| c.starts_with("load")).count();
    assert_eq!(loads, 3);
    assert_eq!(stored_song(h.store.as_ref(), "s0").await.views, 1);

    assert!(!h.player.toggle_repeat());
}

#[tokio::test]
async fn test_random_mode_stays_in_queue() {
    let h = harness().await;
    assert_eq!(h.player.toggle_shuffle(), PlayMode::Random);
    h.player.play(queue(), 0).await.unwrap();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        h.player.on_track_end().await.unwrap();
        let index = h.player.snapshot().index.unwrap();
        assert!(index < 3);
        seen.insert(index);
    }
    assert!(seen.len() > 1);
    assert_eq!(h.player.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_next_wraps_and_previous_restarts() {
    let h = harness().await;
    h.player.play(queue(), 2).await.unwrap();

    h.player.next().await.unwrap();
    assert_eq!(h.player.snapshot().index, Some(0));

    h.player.previous().await.unwrap();
    assert_eq!(h.player.snapshot().index, Some(2));

    h.player.update_position(Duration::from_secs(30));
    h.sink.clear();
    h.player.previous().await.unwrap();
    assert_eq!(h.player.snapshot().index, Some(2));
    assert_eq!(h.player.snapshot().position, Duration::ZERO);
    assert_eq!(h.sink.commands(), vec!["seek 0"]);
}

#[tokio::test]
async fn test_stop_returns_to_idle() {
    let h = harness().await;
    h.player.play(queue(), 0).await.unwrap();
    h.player.update_position(Duration::from_secs(12));

    h.player.stop().unwrap();
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.player.snapshot().position, Duration::ZERO);
}

#[tokio::test]
async fn test_late_track_end_is_ignored() {
    let h = harness().await;
    h.player.play(queue(), 0).await.unwrap();
    h.player.stop().unwrap();
    h.sink.clear();

    h.player.on_track_end().await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.player.snapshot().index, Some(0));
    assert!(h.sink.commands().is_empty());

    // Same after the queue has run out
    h.player.play(queue(), 2).await.unwrap();
    h.player.on_track_end().await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Idle);
    h.sink.clear();

    h.player.on_track_end().await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.player.snapshot().index, Some(2));
    assert!(h.sink.commands().is_empty());

    // A paused track does not end on its own
    h.player.play(queue(), 0).await.unwrap();
    h.player.pause().unwrap();
    h.player.on_track_end().await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert_eq!(h.player.snapshot().index, Some(0));
}

#[tokio::test]
async fn test_like_toggle_syncs_everywhere() {
    let h = harness().await;
    h.player.play(queue(), 0).await.unwrap();

    assert!(h.player.toggle_like().await.unwrap());
    assert!(h.player.is_liked("s0"));
    assert_eq!(stored_song(h.store.as_ref(), "s0").await.likes, 1);

    let saved = h.local.get(&LikeSync::storage_key("u1")).unwrap().unwrap();
    assert_eq!(saved, r#"["s0"]"#);

    let profile: UserProfile = get_as(h.store.as_ref(), USERS, "u1").await.unwrap();
    assert_eq!(profile.liked_songs, vec!["s0".to_string()]);

    assert!(!h.player.toggle_like().await.unwrap());
    assert!(!h.player.is_liked("s0"));
    assert_eq!(stored_song(h.store.as_ref(), "s0").await.likes, 0);
}

#[tokio::test]
async fn test_like_counts_drift_when_remote_fails() {
    let store: Arc<dyn DocumentStore> = Arc::new(FlakyStore { inner: MemoryDocumentStore::new() });
    let h = harness_with(store).await;
    h.player.play(queue(), 1).await.unwrap();

    // Local state wins even though the increment failed
    assert!(h.player.toggle_like_song("s1").await.unwrap());
    assert!(h.player.is_liked("s1"));
    assert_eq!(stored_song(h.store.as_ref(), "s1").await.likes, 0);
    assert_eq!(stored_song(h.store.as_ref(), "s1").await.views, 0);
    assert_eq!(h.player.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_likes_hydrate_from_profile() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let profile = UserProfile {
        id: "u2".to_string(),
        email: "u2@test".to_string(),
        display_name: "U2".to_string(),
        role: Default::default(),
        liked_songs: vec!["s1".to_string(), "s2".to_string()],
    };
    store.set(USERS, "u2", to_fields(&profile).unwrap()).await.unwrap();

    let local = Arc::new(MemoryKeyValueStore::new());
    let likes = LikeSync::new(store.clone(), local.clone(), "u2");
    assert_eq!(likes.load().await.unwrap(), 2);
    assert!(likes.is_liked("s2"));
    assert!(local.get(&LikeSync::storage_key("u2")).unwrap().is_some());

    // Device storage takes precedence on the next load
    local.set(&LikeSync::storage_key("u2"), r#"["s9"]"#).unwrap();
    let reloaded = LikeSync::new(store, local, "u2");
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.liked(), vec!["s9".to_string()]);
}

#[tokio::test]
async fn test_failed_device_write_leaves_likes_untouched() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    seed(store.as_ref()).await;
    let likes = LikeSync::new(store.clone(), Arc::new(FullDiskKeyValueStore::default()), "u1");

    let result = likes.toggle("s1").await;
    assert!(matches!(result, Err(AppError::Io(_))));
    assert!(!likes.is_liked("s1"));
    assert!(likes.liked().is_empty());
    assert_eq!(stored_song(store.as_ref(), "s1").await.likes, 0);
    assert!(store.get(USERS, "u1").await.unwrap().is_none());
}
