use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};

/// Audit tag appended while a scan runs.
///
/// The in-sequence tags form the expected trace of one complete run and are
/// a public contract: clients derive progress from the last tag they saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ScanEventType {
    BeforeScan,
    MusicFolderCheck,
    ParseFileStructure,
    ParseVideo,
    ParsePodcast,
    CleanUpFileStructure,
    ParseAlbum,
    UpdateSortOfAlbum,
    UpdateOrderOfAlbum,
    UpdateSortOfArtist,
    UpdateOrderOfArtist,
    UpdateOrderOfSong,
    RefreshAlbumId3,
    UpdateOrderOfAlbumId3,
    RefreshArtistId3,
    UpdateOrderOfArtistId3,
    UpdateAlbumCounts,
    UpdateGenreMaster,
    RunStats,
    ImportPlaylists,
    Checkpoint,
    AfterScan,
    Success,
    Canceled,
    Destroyed,
    Failed,
    ScannedCount,
}

impl ScanEventType {
    /// Fixed phase order of one run.
    pub const SEQUENCE: [ScanEventType; 22] = [
        ScanEventType::BeforeScan,
        ScanEventType::MusicFolderCheck,
        ScanEventType::ParseFileStructure,
        ScanEventType::ParseVideo,
        ScanEventType::ParsePodcast,
        ScanEventType::CleanUpFileStructure,
        ScanEventType::ParseAlbum,
        ScanEventType::UpdateSortOfAlbum,
        ScanEventType::UpdateOrderOfAlbum,
        ScanEventType::UpdateSortOfArtist,
        ScanEventType::UpdateOrderOfArtist,
        ScanEventType::UpdateOrderOfSong,
        ScanEventType::RefreshAlbumId3,
        ScanEventType::UpdateOrderOfAlbumId3,
        ScanEventType::RefreshArtistId3,
        ScanEventType::UpdateOrderOfArtistId3,
        ScanEventType::UpdateAlbumCounts,
        ScanEventType::UpdateGenreMaster,
        ScanEventType::RunStats,
        ScanEventType::ImportPlaylists,
        ScanEventType::Checkpoint,
        ScanEventType::AfterScan,
    ];

    /// Zero-based position in [`Self::SEQUENCE`], `None` for out-of-sequence tags.
    pub fn position(self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|tag| *tag == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanEventType::Success
                | ScanEventType::Canceled
                | ScanEventType::Destroyed
                | ScanEventType::Failed
        )
    }

    /// `(index_of(last) + 1) / len(sequence)`; terminal tags count as complete.
    pub fn progress(last: Option<ScanEventType>) -> f32 {
        match last {
            None => 0.0,
            Some(tag) if tag.is_terminal() => 1.0,
            Some(tag) => match tag.position() {
                Some(index) => (index + 1) as f32 / Self::SEQUENCE.len() as f32,
                None => 0.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanEventType::BeforeScan => "BEFORE_SCAN",
            ScanEventType::MusicFolderCheck => "MUSIC_FOLDER_CHECK",
            ScanEventType::ParseFileStructure => "PARSE_FILE_STRUCTURE",
            ScanEventType::ParseVideo => "PARSE_VIDEO",
            ScanEventType::ParsePodcast => "PARSE_PODCAST",
            ScanEventType::CleanUpFileStructure => "CLEAN_UP_FILE_STRUCTURE",
            ScanEventType::ParseAlbum => "PARSE_ALBUM",
            ScanEventType::UpdateSortOfAlbum => "UPDATE_SORT_OF_ALBUM",
            ScanEventType::UpdateOrderOfAlbum => "UPDATE_ORDER_OF_ALBUM",
            ScanEventType::UpdateSortOfArtist => "UPDATE_SORT_OF_ARTIST",
            ScanEventType::UpdateOrderOfArtist => "UPDATE_ORDER_OF_ARTIST",
            ScanEventType::UpdateOrderOfSong => "UPDATE_ORDER_OF_SONG",
            ScanEventType::RefreshAlbumId3 => "REFRESH_ALBUM_ID3",
            ScanEventType::UpdateOrderOfAlbumId3 => "UPDATE_ORDER_OF_ALBUM_ID3",
            ScanEventType::RefreshArtistId3 => "REFRESH_ARTIST_ID3",
            ScanEventType::UpdateOrderOfArtistId3 => "UPDATE_ORDER_OF_ARTIST_ID3",
            ScanEventType::UpdateAlbumCounts => "UPDATE_ALBUM_COUNTS",
            ScanEventType::UpdateGenreMaster => "UPDATE_GENRE_MASTER",
            ScanEventType::RunStats => "RUN_STATS",
            ScanEventType::ImportPlaylists => "IMPORT_PLAYLISTS",
            ScanEventType::Checkpoint => "CHECKPOINT",
            ScanEventType::AfterScan => "AFTER_SCAN",
            ScanEventType::Success => "SUCCESS",
            ScanEventType::Canceled => "CANCELED",
            ScanEventType::Destroyed => "DESTROYED",
            ScanEventType::Failed => "FAILED",
            ScanEventType::ScannedCount => "SCANNED_COUNT",
        }
    }
}

impl Display for ScanEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process memory sampled when an event is written, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemorySnapshot {
    pub max_memory: u64,
    pub total_memory: u64,
    pub free_memory: u64,
}

/// Append-only audit row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanEvent {
    pub scan_date: DateTime<Utc>,
    pub emitted_at: DateTime<Utc>,
    pub event_type: ScanEventType,
    pub memory: Option<MemorySnapshot>,
    pub comment: Option<String>,
}

impl ScanEvent {
    pub fn new(scan_date: DateTime<Utc>, event_type: ScanEventType) -> Self {
        Self {
            scan_date,
            emitted_at: Utc::now(),
            event_type,
            memory: None,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Point-in-time view of the scanner for operators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanProgress {
    pub scanning: bool,
    pub processed: u64,
    pub scan_date: Option<DateTime<Utc>>,
    pub last_phase: Option<ScanEventType>,
    pub fraction: f32,
}
