use std::path::Path;

use async_trait::async_trait;
use strata_model::CatalogEntry;

use crate::error::Result;

/// Metadata extracted from one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
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
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TrackTags {
    /// Copy every tag field onto `entry`, overwriting what was there.
    pub fn apply_to(self, entry: &mut CatalogEntry) {
        entry.title = clean(self.title);
        entry.artist = clean(self.artist);
        entry.album_artist = clean(self.album_artist);
        entry.album_name = clean(self.album);
        entry.composer = clean(self.composer);
        entry.genre = clean(self.genre);
        entry.artist_sort = clean(self.artist_sort);
        entry.album_artist_sort = clean(self.album_artist_sort);
        entry.album_sort = clean(self.album_sort);
        entry.composer_sort = clean(self.composer_sort);
        entry.track_number = self.track_number;
        entry.disc_number = self.disc_number;
        entry.year = self.year;
        entry.duration_seconds = self.duration_seconds;
        entry.bit_rate = self.bit_rate;
    }
}

/// Reads embedded tags from one audio file.
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags>;
}
