use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use strata_model::{Album, Artist, CatalogEntry, Genre};
use tokio::sync::Mutex;

use crate::error::{Result, ScanError};
use crate::ports::{IndexKind, SearchIndex};

#[derive(Debug, Default)]
struct IndexState {
    session_open: bool,
    sessions: u32,
    documents: BTreeMap<(IndexKind, i64), String>,
    genres: BTreeMap<String, Genre>,
}

impl IndexState {
    fn writable(&self) -> Result<()> {
        if self.session_open {
            Ok(())
        } else {
            Err(ScanError::Index("write outside of a write session".into()))
        }
    }
}

/// Search index keeping one title string per document. Writes outside a
/// session are rejected the same way a real index writer would.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    state: Arc<Mutex<IndexState>>,
}

impl fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("MemoryIndex");
        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("session_open", &state.session_open)
                    .field("documents", &state.documents.len())
                    .field("genres", &state.genres.len());
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, kind: IndexKind, id: i64) -> bool {
        self.state.lock().await.documents.contains_key(&(kind, id))
    }

    /// Documents stored under `kind`.
    pub async fn count(&self, kind: IndexKind) -> usize {
        self.state
            .lock()
            .await
            .documents
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub async fn genre_names(&self) -> Vec<String> {
        self.state.lock().await.genres.keys().cloned().collect()
    }

    pub async fn is_session_open(&self) -> bool {
        self.state.lock().await.session_open
    }

    pub async fn sessions_started(&self) -> u32 {
        self.state.lock().await.sessions
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn start_write_session(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.session_open = true;
        state.sessions += 1;
        Ok(())
    }

    async fn stop_write_session(&self) -> Result<()> {
        self.state.lock().await.session_open = false;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.writable()?;
        state.documents.clear();
        state.genres.clear();
        Ok(())
    }

    async fn index_entry(&self, entry: &CatalogEntry) -> Result<()> {
        let Some(id) = entry.id else {
            return Err(ScanError::Index(format!(
                "entry {} has no id",
                entry.path.display()
            )));
        };
        let mut state = self.state.lock().await;
        state.writable()?;
        state
            .documents
            .insert((IndexKind::for_entry(entry), id.get()), entry.display_name());
        Ok(())
    }

    async fn index_artist(&self, artist: &Artist) -> Result<()> {
        let Some(id) = artist.id else {
            return Err(ScanError::Index(format!("artist {} has no id", artist.name)));
        };
        let mut state = self.state.lock().await;
        state.writable()?;
        state
            .documents
            .insert((IndexKind::ArtistId3, id.get()), artist.name.clone());
        Ok(())
    }

    async fn index_album(&self, album: &Album) -> Result<()> {
        let Some(id) = album.id else {
            return Err(ScanError::Index(format!("album {} has no id", album.name)));
        };
        let mut state = self.state.lock().await;
        state.writable()?;
        state
            .documents
            .insert((IndexKind::AlbumId3, id.get()), album.name.clone());
        Ok(())
    }

    async fn index_genre(&self, genre: &Genre) -> Result<()> {
        let mut state = self.state.lock().await;
        state.writable()?;
        state.genres.insert(genre.name.clone(), genre.clone());
        Ok(())
    }

    async fn expunge(&self, kind: IndexKind, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.writable()?;
        state.documents.remove(&(kind, id));
        Ok(())
    }

    async fn expunge_genres(&self, keep: &HashSet<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.writable()?;
        state.genres.retain(|name, _| keep.contains(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_model::{AlbumId, FolderId};

    use super::*;

    #[tokio::test]
    async fn writes_require_an_open_session() {
        let index = MemoryIndex::new();
        let mut album = Album::new("A", "B", FolderId(1));
        album.id = Some(AlbumId(7));
        assert!(index.index_album(&album).await.is_err());

        index.start_write_session().await.unwrap();
        index.index_album(&album).await.unwrap();
        assert!(index.contains(IndexKind::AlbumId3, 7).await);
        index.expunge(IndexKind::AlbumId3, 7).await.unwrap();
        assert_eq!(index.count(IndexKind::AlbumId3).await, 0);
        index.stop_write_session().await.unwrap();
        assert!(!index.is_session_open().await);
    }

    #[tokio::test]
    async fn genre_pruning_keeps_listed_names() {
        let index = MemoryIndex::new();
        index.start_write_session().await.unwrap();
        index.index_genre(&Genre::new("Rock")).await.unwrap();
        index.index_genre(&Genre::new("Jazz")).await.unwrap();
        let keep: HashSet<String> = ["Rock".to_string()].into_iter().collect();
        index.expunge_genres(&keep).await.unwrap();
        assert_eq!(index.genre_names().await, vec!["Rock".to_string()]);
    }
}
