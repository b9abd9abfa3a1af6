//! Read-through cache of the music folder list.
//!
//! Disabled for the duration of a scan so readers always hit the repository
//! while rows are being rewritten.

use std::sync::Arc;

use parking_lot::RwLock;
use strata_model::MusicFolder;

use crate::error::Result;
use crate::ports::MusicFolderRepository;

#[derive(Debug, Default)]
struct CacheState {
    enabled: bool,
    folders: Option<Arc<Vec<MusicFolder>>>,
}

/// Enabled-folder list cached for the duration of a walk.
#[derive(Debug)]
pub struct FolderCache {
    state: RwLock<CacheState>,
}

impl Default for FolderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                enabled: true,
                folders: None,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    pub fn enable(&self) {
        self.state.write().enabled = true;
    }

    /// Bypass the cache; every lookup reads the repository.
    pub fn disable(&self) {
        self.state.write().enabled = false;
    }

    /// Drop cached rows. Call after any folder mutation.
    pub fn clear(&self) {
        self.state.write().folders = None;
    }

    pub fn is_warm(&self) -> bool {
        self.state.read().folders.is_some()
    }

    /// Folder list, served from the cache when enabled and warm.
    pub async fn folders(
        &self,
        repository: &dyn MusicFolderRepository,
    ) -> Result<Arc<Vec<MusicFolder>>> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }
        let loaded = Arc::new(repository.all_folders().await?);
        let mut state = self.state.write();
        if state.enabled {
            state.folders = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Enabled folders, from the cache when warm.
    pub async fn enabled_folders(
        &self,
        repository: &dyn MusicFolderRepository,
    ) -> Result<Vec<MusicFolder>> {
        Ok(self
            .folders(repository)
            .await?
            .iter()
            .filter(|folder| folder.enabled)
            .cloned()
            .collect())
    }

    fn cached(&self) -> Option<Arc<Vec<MusicFolder>>> {
        let state = self.state.read();
        if state.enabled {
            state.folders.clone()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;

    #[tokio::test]
    async fn disabled_cache_reads_through() {
        let catalog = MemoryCatalog::new();
        catalog.add_folder("/music", "Music").await;
        let cache = FolderCache::new();

        assert_eq!(cache.folders(&catalog).await.unwrap().len(), 1);
        assert!(cache.is_warm());

        cache.disable();
        cache.clear();
        catalog.add_folder("/more", "More").await;
        assert_eq!(cache.folders(&catalog).await.unwrap().len(), 2);
        assert!(!cache.is_warm());

        cache.enable();
        assert_eq!(cache.enabled_folders(&catalog).await.unwrap().len(), 2);
        assert!(cache.is_warm());
    }
}
