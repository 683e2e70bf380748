use std::io::Cursor;
use std::path::Path;

use id3::{Tag, TagLike};
use log::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration: u64,
}

/// Read ID3 tags and duration from an in-memory MP3. Missing data is left empty.
pub fn probe_mp3(file_name: &str, data: &[u8]) -> AudioTags {
    let mut tags = AudioTags::default();

    match Tag::read_from(Cursor::new(data)) {
        Ok(tag) => {
            tags.title = non_blank(tag.title());
            tags.artist = non_blank(tag.artist());
            tags.album = non_blank(tag.album());
            tags.genre = non_blank(tag.genre());
        }
        Err(e) => {
            info!("Could not read ID3 tags from {}: {}", file_name, e);
        }
    }

    match mp3_duration::from_read(&mut Cursor::new(data)) {
        Ok(d) => {
            tags.duration = d.as_secs();
        }
        Err(e) => {
            info!("Could not get duration for {}: {}", file_name, e);
        }
    }

    tags
}

/// File stem as a last-resort title.
pub fn title_from_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().replace('_', " ").trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
