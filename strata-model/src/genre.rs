use chrono::{DateTime, Utc};

use crate::FolderId;

/// Genre with song and album counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Genre {
    pub name: String,
    pub song_count: u32,
    pub album_count: u32,
}

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            song_count: 0,
            album_count: 0,
        }
    }
}

/// Per-folder counters gathered at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibraryStatistics {
    pub folder_id: FolderId,
    pub scan_date: DateTime<Utc>,
    pub artist_count: u32,
    pub album_count: u32,
    pub song_count: u32,
    pub video_count: u32,
    pub total_size_bytes: u64,
    pub total_duration_seconds: u64,
}
