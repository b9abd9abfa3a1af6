use async_trait::async_trait;
use strata_model::Playlist;

use crate::error::Result;

/// Stored playlists, keyed by file name.
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Insert, or replace the playlist with the same `file_name`.
    async fn upsert_playlist(&self, playlist: Playlist) -> Result<Playlist>;

    async fn playlists(&self) -> Result<Vec<Playlist>>;
}

/// Re-imports playlists from their external definitions.
#[async_trait]
pub trait PlaylistImporter: Send + Sync {
    /// Returns the number of playlists imported.
    async fn import_playlists(&self) -> Result<usize>;
}
