use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{FolderId, MediaFileId, MediaType, UNORDERED};

/// Sentinel instant for "never happened". A container whose
/// `children_last_updated` equals this value is dirty.
pub fn far_past() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Persisted record of one filesystem node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogEntry {
    /// `None` until the repository has stored the row.
    pub id: Option<MediaFileId>,
    pub path: PathBuf,
    /// `None` for folder roots.
    pub parent_path: Option<PathBuf>,
    pub folder_id: FolderId,
    pub media_type: MediaType,
    pub format: Option<String>,
    pub title: Option<String>,
    pub album_name: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub artist_sort: Option<String>,
    pub album_artist_sort: Option<String>,
    pub album_sort: Option<String>,
    pub composer_sort: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub year: Option<i32>,
    pub duration_seconds: Option<u32>,
    pub bit_rate: Option<u32>,
    pub file_size: Option<u64>,
    pub cover_art_path: Option<PathBuf>,
    pub present: bool,
    pub order: i32,
    /// Filesystem modification time observed when the row was last refreshed.
    pub changed: DateTime<Utc>,
    pub created: DateTime<Utc>,
    /// Scan timestamp of the last run that touched this path.
    pub last_scanned: DateTime<Utc>,
    pub children_last_updated: DateTime<Utc>,
    /// Scan timestamp at which metadata was last extracted. `None` means the
    /// entry still waits for its (possibly deferred) parse.
    pub parsed_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn new(
        path: impl Into<PathBuf>,
        parent_path: Option<PathBuf>,
        folder_id: FolderId,
        media_type: MediaType,
    ) -> Self {
        let epoch = far_past();
        Self {
            id: None,
            path: path.into(),
            parent_path,
            folder_id,
            media_type,
            format: None,
            title: None,
            album_name: None,
            artist: None,
            album_artist: None,
            composer: None,
            genre: None,
            artist_sort: None,
            album_artist_sort: None,
            album_sort: None,
            composer_sort: None,
            track_number: None,
            disc_number: None,
            year: None,
            duration_seconds: None,
            bit_rate: None,
            file_size: None,
            cover_art_path: None,
            present: true,
            order: UNORDERED,
            changed: epoch,
            created: epoch,
            last_scanned: epoch,
            children_last_updated: epoch,
            parsed_at: None,
        }
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    /// Title if tagged, otherwise the file name without its extension.
    pub fn display_name(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        if self.media_type.is_container() {
            return self.file_name();
        }
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name())
    }

    /// Album artist, falling back to the track artist.
    pub fn effective_album_artist(&self) -> Option<&str> {
        self.album_artist
            .as_deref()
            .or(self.artist.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn effective_album_artist_sort(&self) -> Option<&str> {
        if self.album_artist.as_deref().is_some_and(|a| !a.trim().is_empty()) {
            self.album_artist_sort.as_deref()
        } else {
            self.artist_sort.as_deref()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_path.is_none()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed_at.is_some()
    }

    /// Whether a child changed since this container was last derived.
    pub fn children_dirty(&self) -> bool {
        self.children_last_updated == far_past()
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
