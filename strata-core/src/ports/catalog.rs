use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_model::{CatalogEntry, FolderId, LibraryStatistics, MediaFileId, MediaType};

use crate::error::Result;

/// Predicate used by candidate batch queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// Already derived once, but something underneath moved since.
    Changed,
    /// Never derived (no parse yet, or no aggregate row yet).
    Unregistered,
}

/// Tag field a sort key belongs to. Declaration order is merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortSource {
    AlbumArtist,
    Artist,
    Composer,
    Album,
}

/// Which tag fields a sort pass reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortScope {
    /// `album` / `album_sort`.
    Album,
    /// `album_artist`, `artist` and `composer` with their sort fields.
    Artist,
}

/// One `(name, sort)` pair carried by a catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct SortTuple {
    pub id: MediaFileId,
    pub name: String,
    pub sort: Option<String>,
    pub source: SortSource,
    pub changed: DateTime<Utc>,
}

/// New sort key for one field of one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortUpdate {
    pub id: MediaFileId,
    pub source: SortSource,
    pub sort: String,
}

/// Read/write surface over catalog entries, including the candidate batch
/// queries that drive incremental work.
///
/// Candidate queries must stop matching a row once it has been processed and
/// persisted, so callers can re-issue the same query until it comes back empty.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_by_path(&self, path: &Path) -> Result<Option<CatalogEntry>>;

    async fn get_by_id(&self, id: MediaFileId) -> Result<Option<CatalogEntry>>;

    /// Present children of `parent`, in path order.
    async fn get_children(&self, parent: &Path) -> Result<Vec<CatalogEntry>>;

    /// Insert or update by path. Returns `None` when the row was rejected,
    /// e.g. its parent row no longer exists.
    async fn persist(&self, entry: CatalogEntry) -> Result<Option<CatalogEntry>>;

    /// Stamp `last_scanned` without rewriting anything else.
    async fn touch(&self, id: MediaFileId, scan_date: DateTime<Utc>) -> Result<()>;

    /// Stamp `last_scanned` on the present row at `root` and every present
    /// row below it. Returns rows touched.
    async fn touch_subtree(&self, root: &Path, scan_date: DateTime<Utc>) -> Result<u64>;

    /// Flag the container at `parent` so its derived fields are recomputed.
    async fn mark_children_dirty(&self, parent: &Path) -> Result<()>;

    /// Present containers/leaves of `media_type` matching [`CandidateKind::Changed`].
    async fn fetch_changed(
        &self,
        media_type: MediaType,
        batch_size: usize,
    ) -> Result<Vec<CatalogEntry>>;

    /// Present rows of `media_type` that were never parsed/derived.
    async fn fetch_unregistered(
        &self,
        media_type: MediaType,
        batch_size: usize,
    ) -> Result<Vec<CatalogEntry>>;

    /// Mark every present row whose `last_scanned` differs from `as_of` as
    /// non-present and dirty its parent container. Returns rows marked.
    async fn mark_non_present(&self, as_of: DateTime<Utc>) -> Result<u64>;

    async fn non_present_ids(&self, media_types: &[MediaType]) -> Result<Vec<MediaFileId>>;

    async fn count_non_present(&self) -> Result<u64>;

    async fn min_id(&self) -> Result<Option<MediaFileId>>;

    async fn max_id(&self) -> Result<Option<MediaFileId>>;

    /// Physically delete non-present rows with `min <= id <= max`.
    async fn expunge_range(&self, min: MediaFileId, max: MediaFileId) -> Result<u64>;

    async fn update_order(&self, id: MediaFileId, order: i32) -> Result<()>;

    /// Every present row of `media_type`, excluding folder roots.
    async fn present_of_type(&self, media_type: MediaType) -> Result<Vec<CatalogEntry>>;

    async fn count_unordered(&self, media_types: &[MediaType]) -> Result<u64>;

    /// Forget every `last_scanned`/parse marker so the next traversal rebuilds
    /// all rows from the filesystem.
    async fn reset_scan_markers(&self) -> Result<u64>;

    async fn sort_tuples(&self, scope: SortScope) -> Result<Vec<SortTuple>>;

    async fn update_sort(&self, update: &SortUpdate) -> Result<()>;

    /// `(genre, song count)` over present music rows.
    async fn genre_song_counts(&self) -> Result<Vec<(String, u32)>>;

    async fn folder_statistics(
        &self,
        folder_id: FolderId,
        scan_date: DateTime<Utc>,
    ) -> Result<LibraryStatistics>;

    async fn save_statistics(&self, statistics: LibraryStatistics) -> Result<()>;

    /// Durable storage checkpoint issued once per run.
    async fn checkpoint(&self) -> Result<()>;

    /// Transaction boundary closing one batch of writes.
    async fn commit_batch(&self) -> Result<()> {
        Ok(())
    }
}
