//! Tag-derived (ID3-style) aggregates. These rows are never authoritative:
//! each one is rebuilt from the present catalog entries sharing its key.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{AlbumId, ArtistId, FolderId, UNORDERED, far_past};

/// Artist aggregate derived from track tags.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Artist {
    pub id: Option<ArtistId>,
    pub name: String,
    pub sort_name: Option<String>,
    /// Alphabetical bucket used for client index bars.
    pub music_index: String,
    pub cover_art_path: Option<PathBuf>,
    pub album_count: u32,
    pub folder_id: FolderId,
    pub present: bool,
    pub last_scanned: DateTime<Utc>,
    /// Scan timestamp of the last rebuild from a representative track.
    pub changed: DateTime<Utc>,
    pub order: i32,
}

impl Artist {
    pub fn new(name: impl Into<String>, folder_id: FolderId) -> Self {
        Self {
            id: None,
            name: name.into(),
            sort_name: None,
            music_index: String::new(),
            cover_art_path: None,
            album_count: 0,
            folder_id,
            present: true,
            last_scanned: far_past(),
            changed: far_past(),
            order: UNORDERED,
        }
    }
}

/// Album aggregate derived from track tags, keyed by artist and name.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Album {
    pub id: Option<AlbumId>,
    pub name: String,
    pub sort_name: Option<String>,
    pub artist: String,
    pub artist_sort: Option<String>,
    pub song_count: u32,
    pub duration_seconds: u64,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub cover_art_path: Option<PathBuf>,
    pub folder_id: FolderId,
    pub present: bool,
    pub last_scanned: DateTime<Utc>,
    pub changed: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub order: i32,
}

impl Album {
    pub fn new(
        artist: impl Into<String>,
        name: impl Into<String>,
        folder_id: FolderId,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            sort_name: None,
            artist: artist.into(),
            artist_sort: None,
            song_count: 0,
            duration_seconds: 0,
            year: None,
            genre: None,
            cover_art_path: None,
            folder_id,
            present: true,
            last_scanned: far_past(),
            changed: far_past(),
            created: far_past(),
            order: UNORDERED,
        }
    }

    /// `(artist, album)` identity shared with the catalog entries it is built from.
    pub fn key(&self) -> (&str, &str) {
        (&self.artist, &self.name)
    }
}
