use std::collections::HashSet;

use async_trait::async_trait;
use strata_model::{Album, Artist, CatalogEntry, Genre};

use crate::error::Result;

/// Document families held by the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    /// File-structure directories (artist level).
    Directory,
    /// File-structure albums.
    Album,
    /// Leaf tracks, videos and episodes.
    Song,
    ArtistId3,
    AlbumId3,
    Genre,
}

impl IndexKind {
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        match entry.media_type {
            strata_model::MediaType::Directory => IndexKind::Directory,
            strata_model::MediaType::Album => IndexKind::Album,
            _ => IndexKind::Song,
        }
    }
}

/// Calls the pipeline makes into the full-text index. Writes are only valid
/// between `start_write_session` and `stop_write_session`.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn start_write_session(&self) -> Result<()>;

    async fn stop_write_session(&self) -> Result<()>;

    /// Drop every document.
    async fn clear(&self) -> Result<()>;

    async fn index_entry(&self, entry: &CatalogEntry) -> Result<()>;

    async fn index_artist(&self, artist: &Artist) -> Result<()>;

    async fn index_album(&self, album: &Album) -> Result<()>;

    async fn index_genre(&self, genre: &Genre) -> Result<()>;

    async fn expunge(&self, kind: IndexKind, id: i64) -> Result<()>;

    /// Remove genre documents whose name is not in `keep`.
    async fn expunge_genres(&self, keep: &HashSet<String>) -> Result<()>;
}
