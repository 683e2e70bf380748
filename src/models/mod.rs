pub mod playlist;
pub mod song;
pub mod upload;
pub mod user;

pub use playlist::Playlist;
pub use song::{NewSong, Song, SongPatch};
pub use upload::UploadRecord;
pub use user::{Role, Session, UserProfile};

// Collection names in the document store
pub const SONGS: &str = "songs";
pub const PLAYLISTS: &str = "playlists";
pub const USERS: &str = "users";
pub const UPLOADS: &str = "uploads";
