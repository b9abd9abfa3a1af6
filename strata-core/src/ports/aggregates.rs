use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_model::{Album, AlbumId, Artist, ArtistId, CatalogEntry, Genre};

use super::catalog::CandidateKind;
use crate::error::Result;

/// Representative track for an `(album artist, album)` key plus the group
/// totals the aggregate must reflect.
#[derive(Debug, Clone, PartialEq)]
pub struct Id3AlbumCandidate {
    pub artist: String,
    pub album: String,
    pub representative: CatalogEntry,
    pub song_count: u32,
    pub duration_seconds: u64,
}

/// Artist name with the track its fields are derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Id3ArtistCandidate {
    pub name: String,
    pub representative: CatalogEntry,
}

/// Storage for the tag-derived artist/album stratum and the genre master.
///
/// A track qualifies for the stratum when it is a present music row with a
/// non-empty album artist (falling back to artist); albums additionally need
/// a non-empty album name.
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// [`CandidateKind::Changed`] matches an album whose track count or
    /// duration moved, whose tracks were re-read since it last changed, or
    /// whose derived fields (sort keys, year, genre, folder, cover resolved
    /// from the representative's ancestors) no longer match its
    /// representative track.
    async fn fetch_album_candidates(
        &self,
        kind: CandidateKind,
        batch_size: usize,
    ) -> Result<Vec<Id3AlbumCandidate>>;

    /// Same as albums, over sort name, folder and cover.
    async fn fetch_artist_candidates(
        &self,
        kind: CandidateKind,
        batch_size: usize,
    ) -> Result<Vec<Id3ArtistCandidate>>;

    async fn get_album(&self, artist: &str, name: &str) -> Result<Option<Album>>;

    async fn get_artist(&self, name: &str) -> Result<Option<Artist>>;

    /// Upsert by `(artist, name)`.
    async fn persist_album(&self, album: Album) -> Result<Option<Album>>;

    /// Upsert by name.
    async fn persist_artist(&self, artist: Artist) -> Result<Option<Artist>>;

    /// Stamp albums that still have a qualifying track with `scan_date` and
    /// mark the rest non-present. Returns the number marked non-present.
    async fn iterate_albums(&self, scan_date: DateTime<Utc>) -> Result<u64>;

    async fn iterate_artists(&self, scan_date: DateTime<Utc>) -> Result<u64>;

    async fn non_present_album_ids(&self) -> Result<Vec<AlbumId>>;

    async fn non_present_artist_ids(&self) -> Result<Vec<ArtistId>>;

    async fn expunge_albums(&self) -> Result<u64>;

    async fn expunge_artists(&self) -> Result<u64>;

    /// Drop the whole artist stratum (full rebuild path).
    async fn purge_artists(&self) -> Result<u64>;

    async fn present_albums(&self) -> Result<Vec<Album>>;

    async fn present_artists(&self) -> Result<Vec<Artist>>;

    async fn update_album_order(&self, id: AlbumId, order: i32) -> Result<()>;

    async fn update_artist_order(&self, id: ArtistId, order: i32) -> Result<()>;

    async fn count_unordered_albums(&self) -> Result<u64>;

    async fn count_unordered_artists(&self) -> Result<u64>;

    async fn update_album_count(&self, id: ArtistId, album_count: u32) -> Result<()>;

    async fn replace_genres(&self, genres: Vec<Genre>) -> Result<()>;

    async fn genres(&self) -> Result<Vec<Genre>>;
}
