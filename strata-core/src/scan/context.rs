use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_model::{MusicFolder, ScanEventType, UNORDERED};
use uuid::Uuid;

use crate::cache::FolderCache;
use crate::error::Result;
use crate::media::{M3uPlaylistImporter, MediaClassifier};
use crate::memory::{MemoryAuditLog, MemoryCatalog, MemoryIndex};
use crate::ports::{
    AggregateRepository, CatalogRepository, MusicFolderRepository, PlaylistImporter,
    ScanAuditLog, SearchIndex, TagReader,
};
use crate::settings::ScannerSettings;
use crate::sort::{Collator, MusicIndex};

/// Collaborators every phase reaches through. Cheap to clone.
#[derive(Clone)]
pub struct ScanPorts {
    pub catalog: Arc<dyn CatalogRepository>,
    pub aggregates: Arc<dyn AggregateRepository>,
    pub folders: Arc<dyn MusicFolderRepository>,
    pub index: Arc<dyn SearchIndex>,
    pub audit: Arc<dyn ScanAuditLog>,
    pub tags: Arc<dyn TagReader>,
    pub playlists: Arc<dyn PlaylistImporter>,
    pub folder_cache: Arc<FolderCache>,
    pub collator: Arc<Collator>,
}

impl fmt::Debug for ScanPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanPorts")
            .field("folder_cache", &self.folder_cache)
            .field("collator", &self.collator)
            .finish_non_exhaustive()
    }
}

impl ScanPorts {
    /// Wire every port to the in-process adapters sharing `catalog`.
    pub fn in_memory(
        catalog: MemoryCatalog,
        index: MemoryIndex,
        audit: MemoryAuditLog,
        tags: Arc<dyn TagReader>,
        settings: &ScannerSettings,
    ) -> Self {
        let shared = Arc::new(catalog);
        let playlists = M3uPlaylistImporter::new(
            settings.scan.playlist_folder.clone(),
            shared.clone(),
            shared.clone(),
        );
        Self {
            catalog: shared.clone(),
            aggregates: shared.clone(),
            folders: shared,
            index: Arc::new(index),
            audit: Arc::new(audit),
            tags,
            playlists: Arc::new(playlists),
            folder_cache: Arc::new(FolderCache::new()),
            collator: Arc::new(Collator::new(&settings.sort.ignored_articles)),
        }
    }
}

/// Immutable per-run snapshot handed to every phase.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub run_id: Uuid,
    pub scan_date: DateTime<Utc>,
    pub settings: Arc<ScannerSettings>,
    /// Folder configuration moved since the previous run, or the previous
    /// run never reached SUCCESS.
    pub folders_changed: bool,
    pub classifier: MediaClassifier,
    pub music_index: MusicIndex,
}

impl ScanContext {
    /// Context with a fresh run id.
    pub fn new(
        scan_date: DateTime<Utc>,
        settings: Arc<ScannerSettings>,
        folders_changed: bool,
    ) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            scan_date,
            classifier: MediaClassifier::from_options(&settings.scan),
            music_index: MusicIndex::parse(&settings.sort.index_string),
            settings,
            folders_changed,
        }
    }

    /// Build the context for a run starting at `scan_date`, deciding
    /// `folders_changed` from the audit trail and the folder rows.
    pub async fn prepare(
        ports: &ScanPorts,
        scan_date: DateTime<Utc>,
        settings: Arc<ScannerSettings>,
    ) -> Result<Self> {
        let folders = ports.folders.all_folders().await?;
        let previous = previous_run(ports.audit.as_ref(), scan_date).await?;
        let folders_changed = folders_changed_since(&folders, previous);
        Ok(Self::new(scan_date, settings, folders_changed))
    }

    /// Whether this run rebuilds everything regardless of timestamps.
    pub fn ignore_timestamps(&self) -> bool {
        self.settings.scan.ignore_file_timestamps
    }
}

/// `(scan_date, succeeded)` of the newest earlier run, if any.
async fn previous_run(
    audit: &dyn ScanAuditLog,
    current: DateTime<Utc>,
) -> Result<Option<(DateTime<Utc>, bool)>> {
    let Some(last) = audit.last_event().await? else {
        return Ok(None);
    };
    if last.scan_date >= current {
        return Ok(None);
    }
    Ok(Some((
        last.scan_date,
        last.event_type == ScanEventType::Success,
    )))
}

fn folders_changed_since(
    folders: &[MusicFolder],
    previous: Option<(DateTime<Utc>, bool)>,
) -> bool {
    match previous {
        None | Some((_, false)) => true,
        Some((last, true)) => folders
            .iter()
            .any(|folder| folder.order == UNORDERED || folder.changed > last),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use strata_model::FolderId;

    use super::*;

    #[test]
    fn only_a_clean_previous_run_with_stable_folders_is_unchanged() {
        let now = Utc::now();
        let mut folder = MusicFolder::new(FolderId(1), "/m", "m");
        folder.order = 1;
        folder.changed = now - TimeDelta::days(2);
        let folders = vec![folder.clone()];

        assert!(folders_changed_since(&folders, None));
        assert!(folders_changed_since(&folders, Some((now - TimeDelta::days(1), false))));
        assert!(!folders_changed_since(&folders, Some((now - TimeDelta::days(1), true))));
        assert!(folders_changed_since(&folders, Some((now - TimeDelta::days(3), true))));

        folder.order = UNORDERED;
        assert!(folders_changed_since(&[folder], Some((now, true))));
    }
}
