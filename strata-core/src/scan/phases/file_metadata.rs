//! Filesystem-hierarchy albums, sort-key reconciliation and display order.

use std::cmp::Ordering;

use strata_model::{CatalogEntry, MediaType, ScanEventType};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ports::{CandidateKind, SortScope};
use crate::scan::context::ScanContext;
use crate::scan::helper::ScanHelper;
use crate::scan::ordering::{UpstreamChanges, should_recompute_ordering};
use crate::sort::{Collator, compare_tracks, reconcile};

const SONG_TYPES: [MediaType; 3] = [MediaType::Music, MediaType::Podcast, MediaType::Audiobook];

/// Counters from the file-structure derivation phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileMetadataReport {
    pub parsed_albums: usize,
    pub album_sort_updates: usize,
    pub artist_sort_updates: usize,
    /// `None` when the step was skipped.
    pub album_orders: Option<usize>,
    pub artist_orders: Option<usize>,
    pub song_orders: Option<usize>,
}

/// Derives album rows, sort keys and display order over the file structure.
#[derive(Debug)]
pub struct FileMetadataScan<'a> {
    helper: &'a ScanHelper,
    ctx: &'a ScanContext,
}

impl<'a> FileMetadataScan<'a> {
    /// Bind the phase to one run.
    pub fn new(helper: &'a ScanHelper, ctx: &'a ScanContext) -> Self {
        Self { helper, ctx }
    }

    /// Parse dirty albums, reconcile sort keys, then reorder.
    pub async fn run(&self) -> Result<FileMetadataReport> {
        let catalog = &self.helper.ports().catalog;
        let mut report = FileMetadataReport::default();
        let folders_touched = self.helper.folders_touched(self.ctx).await?;

        report.parsed_albums = self.parse_albums().await?;
        self.helper
            .write_event(self.ctx, ScanEventType::ParseAlbum, None)
            .await?;

        report.album_sort_updates = self
            .update_sort(SortScope::Album, ScanEventType::UpdateSortOfAlbum)
            .await?;
        let upstream = UpstreamChanges {
            parsed_albums: report.parsed_albums,
            sort_updates: report.album_sort_updates,
            unordered: catalog.count_unordered(&[MediaType::Album]).await?,
            folders_touched,
            ..UpstreamChanges::default()
        };
        report.album_orders = self
            .update_order(MediaType::Album, ScanEventType::UpdateOrderOfAlbum, &upstream)
            .await?;

        report.artist_sort_updates = self
            .update_sort(SortScope::Artist, ScanEventType::UpdateSortOfArtist)
            .await?;
        let upstream = UpstreamChanges {
            sort_updates: report.artist_sort_updates,
            unordered: catalog.count_unordered(&[MediaType::Directory]).await?,
            folders_touched,
            ..UpstreamChanges::default()
        };
        report.artist_orders = self
            .update_order(
                MediaType::Directory,
                ScanEventType::UpdateOrderOfArtist,
                &upstream,
            )
            .await?;

        let upstream = UpstreamChanges {
            parsed_albums: report.parsed_albums,
            unordered: catalog.count_unordered(&SONG_TYPES).await?,
            folders_touched,
            ..UpstreamChanges::default()
        };
        report.song_orders = self.update_song_order(&upstream).await?;

        info!(
            target: "scan::summary",
            run_id = %self.ctx.run_id,
            parsed_albums = report.parsed_albums,
            album_sorts = report.album_sort_updates,
            artist_sorts = report.artist_sort_updates,
            "file structure metadata refreshed"
        );
        Ok(report)
    }

    /// Drain dirty albums, then albums never parsed.
    async fn parse_albums(&self) -> Result<usize> {
        let catalog = &self.helper.ports().catalog;
        let batch = &self.helper.settings().batch;
        let mut parsed = 0;
        for kind in [CandidateKind::Changed, CandidateKind::Unregistered] {
            let stats = self
                .helper
                .drain_candidates(
                    batch.candidate_batch_size,
                    batch.album_checkpoint,
                    |limit| match kind {
                        CandidateKind::Changed => catalog.fetch_changed(MediaType::Album, limit),
                        CandidateKind::Unregistered => {
                            catalog.fetch_unregistered(MediaType::Album, limit)
                        }
                    },
                    |album| self.parse_album(album),
                )
                .await?;
            debug!(target: "scan::phase", ?kind, written = stats.written, "albums parsed");
            parsed += stats.written;
        }
        Ok(parsed)
    }

    /// Copy album-level fields from the first present song under `album`.
    async fn parse_album(&self, mut album: CatalogEntry) -> Result<bool> {
        let ports = self.helper.ports();
        let mut children: Vec<CatalogEntry> = ports
            .catalog
            .get_children(&album.path)
            .await?
            .into_iter()
            .filter(|child| child.media_type.is_audio())
            .collect();
        children.sort_by(|a, b| {
            b.is_parsed()
                .cmp(&a.is_parsed())
                .then_with(|| compare_tracks(a, b))
        });

        if let Some(first) = children.first() {
            album.artist = first.effective_album_artist().map(str::to_string);
            album.album_artist = first.album_artist.clone();
            album.album_name = first.album_name.clone();
            album.year = first.year;
            album.genre = first.genre.clone();
            album.album_sort = first.album_sort.clone();
            album.artist_sort = first.artist_sort.clone();
            album.album_artist_sort = first.album_artist_sort.clone();
        }
        album.duration_seconds = children
            .iter()
            .try_fold(0u32, |total, child| {
                total.checked_add(child.duration_seconds.unwrap_or(0))
            });
        if album.parsed_at.is_none() {
            album.last_scanned = self.ctx.scan_date;
        }
        album.children_last_updated = self.ctx.scan_date;
        album.parsed_at = Some(self.ctx.scan_date);

        let Some(saved) = ports.catalog.persist(album).await? else {
            warn!(target: "scan::phase", "album parent missing, album not updated");
            return Ok(false);
        };
        ports.index.index_entry(&saved).await?;
        Ok(true)
    }

    /// Reconcile sort tags for one scope and re-index every touched row.
    async fn update_sort(&self, scope: SortScope, tag: ScanEventType) -> Result<usize> {
        if !self.helper.settings().sort.reconcile_sort_keys() {
            self.helper.write_skipped(self.ctx, tag).await?;
            return Ok(0);
        }
        let ports = self.helper.ports();
        let tuples = ports.catalog.sort_tuples(scope).await?;
        let reconciliation = reconcile(tuples, &ports.collator);
        for update in reconciliation.updates() {
            ports.catalog.update_sort(update).await?;
        }
        let affected = reconciliation.affected_ids();
        for (n, id) in affected.iter().enumerate() {
            if let Some(entry) = ports.catalog.get_by_id(*id).await? {
                ports.index.index_entry(&entry).await?;
            }
            self.helper
                .throttle(n + 1, self.helper.settings().batch.reorder_checkpoint)
                .await?;
        }
        if !affected.is_empty() {
            ports.catalog.commit_batch().await?;
        }
        self.helper
            .write_event(
                self.ctx,
                tag,
                Some(format!(
                    "merged {}, copied {}, compensated {}",
                    reconciliation.merged.len(),
                    reconciliation.copied.len(),
                    reconciliation.compensated.len()
                )),
            )
            .await?;
        Ok(affected.len())
    }

    async fn update_order(
        &self,
        media_type: MediaType,
        tag: ScanEventType,
        upstream: &UpstreamChanges,
    ) -> Result<Option<usize>> {
        if !should_recompute_ordering(self.ctx, upstream) {
            self.helper.write_skipped(self.ctx, tag).await?;
            return Ok(None);
        }
        let ports = self.helper.ports();
        let items = ports.catalog.present_of_type(media_type).await?;
        let collator = ports.collator.as_ref();
        let rewritten = self
            .helper
            .reorder(
                items,
                |a, b| compare_containers(collator, a, b),
                |id, order| ports.catalog.update_order(id, order),
            )
            .await?;
        self.helper
            .write_event(self.ctx, tag, Some(rewritten.to_string()))
            .await?;
        Ok(Some(rewritten))
    }

    async fn update_song_order(&self, upstream: &UpstreamChanges) -> Result<Option<usize>> {
        let tag = ScanEventType::UpdateOrderOfSong;
        if !should_recompute_ordering(self.ctx, upstream) {
            self.helper.write_skipped(self.ctx, tag).await?;
            return Ok(None);
        }
        let ports = self.helper.ports();
        let mut songs = Vec::new();
        for media_type in SONG_TYPES {
            songs.extend(ports.catalog.present_of_type(media_type).await?);
        }
        let rewritten = self
            .helper
            .reorder(
                songs,
                |a, b| {
                    a.parent_path
                        .cmp(&b.parent_path)
                        .then_with(|| compare_tracks(a, b))
                },
                |id, order| ports.catalog.update_order(id, order),
            )
            .await?;
        self.helper
            .write_event(self.ctx, tag, Some(rewritten.to_string()))
            .await?;
        Ok(Some(rewritten))
    }
}

/// Albums sort by album name (or sort tag), directories by display name
/// (or artist sort tag). Path breaks ties.
fn compare_containers(collator: &Collator, a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    let key = |entry: &CatalogEntry| -> (String, Option<String>) {
        match entry.media_type {
            MediaType::Album => (
                entry
                    .album_name
                    .clone()
                    .unwrap_or_else(|| entry.display_name()),
                entry.album_sort.clone(),
            ),
            _ => (entry.display_name(), entry.effective_album_artist_sort().map(str::to_string)),
        }
    };
    let (a_name, a_sort) = key(a);
    let (b_name, b_sort) = key(b);
    collator
        .compare_sortable((&a_name, a_sort.as_deref()), (&b_name, b_sort.as_deref()))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use strata_model::FolderId;

    use super::*;

    fn album(path: &str, name: Option<&str>, sort: Option<&str>) -> CatalogEntry {
        let mut entry = CatalogEntry::new(
            path,
            Some(PathBuf::from("/m")),
            FolderId(1),
            MediaType::Album,
        );
        entry.album_name = name.map(str::to_string);
        entry.album_sort = sort.map(str::to_string);
        entry
    }

    #[test]
    fn albums_compare_by_sort_tag_and_ignore_articles() {
        let collator = Collator::default();
        let abbey = album("/m/x", Some("The Abbey Road"), None);
        let zed = album("/m/y", Some("Alpha"), Some("Zed"));
        let bravo = album("/m/z", Some("Bravo"), None);
        let mut items = vec![zed.clone(), bravo.clone(), abbey.clone()];
        items.sort_by(|a, b| compare_containers(&collator, a, b));
        assert_eq!(items, vec![abbey, bravo, zed]);
    }

    #[test]
    fn untagged_albums_fall_back_to_directory_name() {
        let collator = Collator::default();
        let a = album("/m/Alpha", None, None);
        let b = album("/m/beta", None, None);
        assert_eq!(compare_containers(&collator, &a, &b), Ordering::Less);
    }
}
