use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use strata_model::Playlist;
use tracing::{debug, warn};

use crate::error::Result;
use crate::ports::{CatalogRepository, PlaylistImporter, PlaylistRepository};

const PLAYLIST_EXTENSIONS: [&str; 2] = ["m3u", "m3u8"];

/// Imports `.m3u`/`.m3u8` files from one directory. Entries are resolved
/// against the catalog by path; relative lines resolve against the playlist
/// file's directory. Unknown or non-present paths are dropped.
pub struct M3uPlaylistImporter {
    folder: Option<PathBuf>,
    catalog: Arc<dyn CatalogRepository>,
    playlists: Arc<dyn PlaylistRepository>,
}

impl std::fmt::Debug for M3uPlaylistImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("M3uPlaylistImporter")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl M3uPlaylistImporter {
    pub fn new(
        folder: Option<PathBuf>,
        catalog: Arc<dyn CatalogRepository>,
        playlists: Arc<dyn PlaylistRepository>,
    ) -> Self {
        Self {
            folder,
            catalog,
            playlists,
        }
    }

    fn is_playlist(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| PLAYLIST_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Paths listed by an M3U body, in order. Comment and directive lines
    /// (`#EXTM3U`, `#EXTINF`, ...) are skipped.
    pub fn parse(body: &str, base: &Path) -> Vec<PathBuf> {
        body.lines()
            .map(|line| line.trim().trim_start_matches('\u{feff}'))
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let path = PathBuf::from(line);
                if path.is_absolute() {
                    path
                } else {
                    base.join(path)
                }
            })
            .collect()
    }

    async fn import_file(&self, path: &Path) -> Result<Playlist> {
        let body = tokio::fs::read_to_string(path).await?;
        let base = path.parent().unwrap_or_else(|| Path::new("/"));
        let mut entries = Vec::new();
        for listed in Self::parse(&body, base) {
            match self.catalog.get_by_path(&listed).await? {
                Some(entry) if entry.present && entry.media_type.is_leaf() => {
                    if let Some(id) = entry.id {
                        entries.push(id);
                    }
                }
                _ => debug!(target: "scan::playlists", path = %listed.display(), "playlist entry not in catalog"),
            }
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        self.playlists
            .upsert_playlist(Playlist {
                id: None,
                name,
                file_name,
                entries,
                imported_at: Utc::now(),
            })
            .await
    }
}

#[async_trait]
impl PlaylistImporter for M3uPlaylistImporter {
    async fn import_playlists(&self) -> Result<usize> {
        let Some(folder) = &self.folder else {
            return Ok(0);
        };
        let mut dir = match tokio::fs::read_dir(folder).await {
            Ok(dir) => dir,
            Err(err) => {
                warn!(target: "scan::playlists", folder = %folder.display(), error = %err, "playlist folder unreadable");
                return Ok(0);
            }
        };
        let mut files = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if Self::is_playlist(&path) {
                files.push(path);
            }
        }
        files.sort();

        let mut imported = 0;
        for file in files {
            match self.import_file(&file).await {
                Ok(_) => imported += 1,
                Err(err) => {
                    warn!(target: "scan::playlists", file = %file.display(), error = %err, "skipping playlist");
                }
            }
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use strata_model::{CatalogEntry, FolderId, MediaType};

    use super::*;
    use crate::memory::MemoryCatalog;

    #[test]
    fn parse_skips_directives_and_resolves_relative_lines() {
        let body = "#EXTM3U\n#EXTINF:123,Band - Song\nBand/Debut/01 Song.mp3\n\n/abs/02.mp3\n";
        let paths = M3uPlaylistImporter::parse(body, Path::new("/music"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/music/Band/Debut/01 Song.mp3"),
                PathBuf::from("/abs/02.mp3")
            ]
        );
    }

    #[tokio::test]
    async fn import_resolves_known_tracks_and_replaces_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let song_path = root.join("song.mp3");

        let catalog = MemoryCatalog::new();
        catalog
            .persist(CatalogEntry::new(&root, None, FolderId(1), MediaType::Directory))
            .await
            .unwrap();
        let song = catalog
            .persist(CatalogEntry::new(
                &song_path,
                Some(root.clone()),
                FolderId(1),
                MediaType::Music,
            ))
            .await
            .unwrap()
            .unwrap();

        std::fs::write(root.join("mix.m3u"), "#EXTM3U\nsong.mp3\nmissing.mp3\n").unwrap();
        std::fs::write(root.join("notes.txt"), "ignored").unwrap();

        let shared = Arc::new(catalog.clone());
        let importer = M3uPlaylistImporter::new(Some(root.clone()), shared.clone(), shared.clone());
        assert_eq!(importer.import_playlists().await.unwrap(), 1);
        assert_eq!(importer.import_playlists().await.unwrap(), 1);

        let playlists = catalog.playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].name, "mix");
        assert_eq!(playlists[0].entries, vec![song.id.unwrap()]);
    }
}
