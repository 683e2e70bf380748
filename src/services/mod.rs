pub mod admin;
pub mod catalog;
pub mod likes;
pub mod player;
pub mod playlists;
pub mod relay;
pub mod users;
pub mod views;

pub use admin::AdminSongs;
pub use catalog::Catalog;
pub use likes::LikeSync;
pub use player::{AudioSink, PlayMode, PlaybackController, PlaybackState, PlayerEvent, PlayerSnapshot};
pub use playlists::{validate_playlist_name, PlaylistService};
pub use relay::UploadRelay;
pub use users::{require_admin, UserService};
pub use views::ViewTracker;
