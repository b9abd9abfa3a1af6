//! Scanner knobs. Every field carries a default so deployments can supply a
//! partial configuration payload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_IGNORED_ARTICLES: &str = "The El La Las Le Les";
pub const DEFAULT_INDEX_STRING: &str =
    "A B C D E F G H I J K L M N O P Q R S T U V W X-Z(XYZ)";

pub fn default_music_extensions_vec() -> Vec<String> {
    [
        "mp3", "ogg", "oga", "opus", "aac", "m4a", "m4b", "flac", "wav", "wma",
        "aif", "aiff", "ape", "mpc", "shn", "dsf", "dff", "wv",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

pub fn default_video_extensions_vec() -> Vec<String> {
    [
        "flv", "avi", "mpg", "mpeg", "mp4", "m4v", "mkv", "mov", "wmv", "ogv",
        "divx", "m2ts", "ts", "webm",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

pub fn default_cover_art_names_vec() -> Vec<String> {
    [
        "cover.jpg", "cover.png", "folder.jpg", "folder.png", "front.jpg",
        "front.png", "albumart.jpg",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// Every knob the scan pipeline reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub scan: ScanOptions,
    pub sort: SortOptions,
    pub audit: AuditOptions,
    pub batch: BatchOptions,
}

/// What the walk picks up and how fast it goes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Re-read every file regardless of modification time, purge the artist
    /// aggregates and rebuild the search index from scratch.
    pub ignore_file_timestamps: bool,
    /// Audio below this directory is catalogued as podcast episodes.
    pub podcast_folder: Option<PathBuf>,
    /// Directory holding `.m3u`/`.m3u8` definitions imported after each run.
    pub playlist_folder: Option<PathBuf>,
    /// Regex matched against file names; matches are not catalogued.
    pub excluded_pattern: Option<String>,
    pub show_hidden_files: bool,
    pub music_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    /// Preferred cover image names, checked in order before any other image.
    pub cover_art_names: Vec<String>,
    /// Sleep inserted at each throttle checkpoint. Zero only yields.
    pub throttle_ms: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore_file_timestamps: false,
            podcast_folder: None,
            playlist_folder: None,
            excluded_pattern: None,
            show_hidden_files: false,
            music_extensions: default_music_extensions_vec(),
            video_extensions: default_video_extensions_vec(),
            cover_art_names: default_cover_art_names_vec(),
            throttle_ms: 0,
        }
    }
}

/// Collation and sort-key reconciliation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOptions {
    /// Strict sort requested: reconcile conflicting sort tags.
    pub strict: bool,
    /// Sort cleansing enabled. Reconciliation needs both flags.
    pub cleansing: bool,
    pub ignored_articles: String,
    pub index_string: String,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            strict: true,
            cleansing: true,
            ignored_articles: DEFAULT_IGNORED_ARTICLES.to_string(),
            index_string: DEFAULT_INDEX_STRING.to_string(),
        }
    }
}

impl SortOptions {
    /// Whether the sort-key passes run at all.
    pub fn reconcile_sort_keys(&self) -> bool {
        self.strict && self.cleansing
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditOptions {
    /// Persist every phase tag. When off only terminal tags are written.
    pub enabled: bool,
    pub memory_metrics: bool,
    /// Days of audit history to keep. `None` keeps only the latest run.
    pub retention_days: Option<u32>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_metrics: false,
            retention_days: None,
        }
    }
}

/// Batch sizes and checkpoint intervals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub candidate_batch_size: usize,
    pub album_checkpoint: usize,
    pub album_id3_checkpoint: usize,
    pub artist_id3_checkpoint: usize,
    pub reorder_checkpoint: usize,
    pub expunge_checkpoint: usize,
    pub expunge_range: i64,
    pub stats_checkpoint: usize,
    pub progress_interval: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            candidate_batch_size: 100,
            album_checkpoint: 200,
            album_id3_checkpoint: 4_000,
            artist_id3_checkpoint: 15_000,
            reorder_checkpoint: 6_000,
            expunge_checkpoint: 1_000,
            expunge_range: 1_000,
            stats_checkpoint: 4,
            progress_interval: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_keeps_defaults() {
        let parsed: ScannerSettings =
            serde_json::from_str(r#"{"sort":{"strict":false}}"#).expect("valid json");
        assert!(!parsed.sort.strict);
        assert!(parsed.sort.cleansing);
        assert!(!parsed.sort.reconcile_sort_keys());
        assert_eq!(parsed.batch, BatchOptions::default());
        assert!(parsed.scan.music_extensions.iter().any(|ext| ext == "flac"));
    }
}
