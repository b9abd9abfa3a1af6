//! Utilities shared by every phase: interruption checks, throttling, audit
//! events, the candidate batch loop, reordering and presence-expunge.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use strata_model::{
    Album, AlbumId, Artist, ArtistId, CatalogEntry, MediaFileId, MediaType, ScanEvent,
    ScanEventType,
};
use tracing::{debug, info};

use super::context::{ScanContext, ScanPorts};
use super::metrics::sample_memory;
use super::state::ScanState;
use crate::error::{Result, ScanError};
use crate::ports::{Id3AlbumCandidate, Id3ArtistCandidate, IndexKind};
use crate::settings::ScannerSettings;

/// Comment attached to steps that were elided.
pub const SKIPPED: &str = "skipped";

/// Reason carried by [`ScanError::Interrupted`] after a cancel.
pub const CANCELED_REASON: &str = "canceled";
/// Reason carried by [`ScanError::Interrupted`] after shutdown.
pub const DESTROYED_REASON: &str = "destroyed";

/// Anything the candidate batch loop can process. The key identifies a
/// candidate across re-fetches of the same query.
pub trait BatchCandidate {
    type Key: Eq + Hash;

    fn candidate_key(&self) -> Self::Key;
}

impl BatchCandidate for CatalogEntry {
    type Key = PathBuf;

    fn candidate_key(&self) -> PathBuf {
        self.path.clone()
    }
}

impl BatchCandidate for Id3AlbumCandidate {
    type Key = (String, String);

    fn candidate_key(&self) -> (String, String) {
        (self.artist.clone(), self.album.clone())
    }
}

impl BatchCandidate for Id3ArtistCandidate {
    type Key = String;

    fn candidate_key(&self) -> String {
        self.name.clone()
    }
}

/// Rows carrying a persisted display order.
pub trait Orderable {
    type Id: Copy;

    fn order_id(&self) -> Option<Self::Id>;
    fn current_order(&self) -> i32;
    fn assign_order(&mut self, order: i32);
}

impl Orderable for CatalogEntry {
    type Id = MediaFileId;

    fn order_id(&self) -> Option<MediaFileId> {
        self.id
    }

    fn current_order(&self) -> i32 {
        self.order
    }

    fn assign_order(&mut self, order: i32) {
        self.order = order;
    }
}

impl Orderable for Album {
    type Id = AlbumId;

    fn order_id(&self) -> Option<AlbumId> {
        self.id
    }

    fn current_order(&self) -> i32 {
        self.order
    }

    fn assign_order(&mut self, order: i32) {
        self.order = order;
    }
}

impl Orderable for Artist {
    type Id = ArtistId;

    fn order_id(&self) -> Option<ArtistId> {
        self.id
    }

    fn current_order(&self) -> i32 {
        self.order
    }

    fn assign_order(&mut self, order: i32) {
        self.order = order;
    }
}

/// Counters from one [`ScanHelper::drain_candidates`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Distinct candidates handed to the processor.
    pub attempted: usize,
    /// Candidates the processor reported as written.
    pub written: usize,
    /// Candidates skipped after a per-item failure. They still match the
    /// query and are picked up again next run.
    pub skipped: usize,
}

/// Counters from one presence-expunge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpungeStats {
    pub index_removals: usize,
    pub deleted_rows: u64,
}

/// Lock state, ports and settings every phase works through.
pub struct ScanHelper {
    state: Arc<ScanState>,
    ports: ScanPorts,
    settings: Arc<ScannerSettings>,
}

impl fmt::Debug for ScanHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanHelper")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ScanHelper {
    /// Bundle what one pipeline shares across runs.
    pub fn new(state: Arc<ScanState>, ports: ScanPorts, settings: Arc<ScannerSettings>) -> Self {
        Self {
            state,
            ports,
            settings,
        }
    }

    /// Lock and interruption flags.
    pub fn state(&self) -> &Arc<ScanState> {
        &self.state
    }

    /// External collaborators.
    pub fn ports(&self) -> &ScanPorts {
        &self.ports
    }

    /// Settings this pipeline was built with.
    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    /// Whether a cancel or shutdown is pending.
    pub fn is_interrupted(&self) -> bool {
        self.state.is_destroyed() || self.state.is_cancel_requested()
    }

    /// `Err(Interrupted)` once a cancel or shutdown has been requested.
    /// Shutdown wins when both are set.
    pub fn check_interrupted(&self) -> Result<()> {
        if self.state.is_destroyed() {
            return Err(ScanError::Interrupted {
                reason: DESTROYED_REASON,
            });
        }
        if self.state.is_cancel_requested() {
            return Err(ScanError::Interrupted {
                reason: CANCELED_REASON,
            });
        }
        Ok(())
    }

    /// Sleep for the configured throttle (or just yield), then check for
    /// interruption. Shutdown cuts the sleep short.
    pub async fn checkpoint(&self) -> Result<()> {
        let millis = self.settings.scan.throttle_ms;
        if millis == 0 {
            tokio::task::yield_now().await;
        } else {
            let shutdown = self.state.shutdown_token();
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
            }
        }
        self.check_interrupted()
    }

    /// [`Self::checkpoint`] on every `every`-th call.
    pub async fn throttle(&self, count: usize, every: usize) -> Result<()> {
        if every == 0 || count == 0 || count % every != 0 {
            return Ok(());
        }
        self.checkpoint().await
    }

    /// Append an audit row. With auditing disabled only terminal tags are
    /// stored; the last phase is tracked either way.
    pub async fn write_event(
        &self,
        ctx: &ScanContext,
        tag: ScanEventType,
        comment: Option<String>,
    ) -> Result<()> {
        if tag.position().is_some() || tag.is_terminal() {
            self.state.set_last_phase(tag);
        }
        let audit = &self.settings.audit;
        if !audit.enabled && !tag.is_terminal() {
            debug!(target: "scan::audit", run_id = %ctx.run_id, phase = %tag, "audit disabled, event not stored");
            return Ok(());
        }

        let mut event = ScanEvent::new(ctx.scan_date, tag);
        event.comment = comment;
        if audit.memory_metrics {
            event.memory = sample_memory().await;
        }
        info!(
            target: "scan::audit",
            run_id = %ctx.run_id,
            scan_date = %ctx.scan_date,
            phase = %tag,
            comment = event.comment.as_deref().unwrap_or(""),
            "scan event"
        );
        self.ports.audit.append(event).await
    }

    /// Record `tag` with the [`SKIPPED`] comment.
    pub async fn write_skipped(&self, ctx: &ScanContext, tag: ScanEventType) -> Result<()> {
        self.write_event(ctx, tag, Some(SKIPPED.to_string())).await
    }

    /// Folder rows modified by this run so far.
    pub async fn folders_touched(&self, ctx: &ScanContext) -> Result<usize> {
        Ok(self
            .ports
            .folders
            .all_folders()
            .await?
            .iter()
            .filter(|folder| folder.changed >= ctx.scan_date)
            .count())
    }

    /// The candidate batch loop.
    ///
    /// `fetch(limit)` re-issues the same candidate query each round instead
    /// of paging; rows the processor wrote stop matching. `process` returns
    /// `Ok(false)` for a per-item failure it already logged. Those rows
    /// keep matching, so the limit grows by the number skipped and a round
    /// that yields nothing new means the query is exhausted.
    pub async fn drain_candidates<T, F, FFut, P, PFut>(
        &self,
        batch_size: usize,
        checkpoint_every: usize,
        mut fetch: F,
        mut process: P,
    ) -> Result<DrainStats>
    where
        T: BatchCandidate,
        F: FnMut(usize) -> FFut,
        FFut: Future<Output = Result<Vec<T>>>,
        P: FnMut(T) -> PFut,
        PFut: Future<Output = Result<bool>>,
    {
        let batch_size = batch_size.max(1);
        let mut attempted = HashSet::new();
        let mut stats = DrainStats::default();

        loop {
            self.check_interrupted()?;
            let batch = fetch(batch_size + stats.skipped).await?;
            if batch.is_empty() {
                break;
            }

            let mut fresh = 0;
            for candidate in batch {
                if !attempted.insert(candidate.candidate_key()) {
                    continue;
                }
                fresh += 1;
                stats.attempted += 1;
                if process(candidate).await? {
                    stats.written += 1;
                } else {
                    stats.skipped += 1;
                }
                self.throttle(stats.attempted, checkpoint_every).await?;
            }
            self.ports.catalog.commit_batch().await?;

            if fresh == 0 {
                break;
            }
        }
        Ok(stats)
    }

    /// Sort `items` with `compare` and persist the 1-based position of every
    /// row whose stored order differs. Returns the number of rows rewritten.
    pub async fn reorder<T, C, P, Fut>(
        &self,
        mut items: Vec<T>,
        compare: C,
        mut persist: P,
    ) -> Result<usize>
    where
        T: Orderable,
        C: FnMut(&T, &T) -> Ordering,
        P: FnMut(T::Id, i32) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        items.sort_by(compare);
        let every = self.settings.batch.reorder_checkpoint;
        let mut rewritten = 0;
        for (index, item) in items.iter_mut().enumerate() {
            let expected = i32::try_from(index + 1)
                .map_err(|_| ScanError::Internal("order position overflow".into()))?;
            if item.current_order() == expected {
                continue;
            }
            let Some(id) = item.order_id() else {
                continue;
            };
            item.assign_order(expected);
            persist(id, expected).await?;
            rewritten += 1;
            self.throttle(rewritten, every).await?;
        }
        Ok(rewritten)
    }

    /// Presence-expunge over the catalog: drop non-present directories,
    /// albums and leaves from the index, then delete the rows in id ranges.
    pub async fn expunge_non_present(&self) -> Result<ExpungeStats> {
        let catalog = &self.ports.catalog;
        let index = &self.ports.index;
        let batch = &self.settings.batch;
        let mut stats = ExpungeStats::default();

        let pending = catalog.count_non_present().await?;
        if pending == 0 {
            return Ok(stats);
        }

        for id in catalog.non_present_ids(&[MediaType::Directory]).await? {
            index.expunge(IndexKind::Directory, id.get()).await?;
            stats.index_removals += 1;
        }
        for id in catalog.non_present_ids(&[MediaType::Album]).await? {
            index.expunge(IndexKind::Album, id.get()).await?;
            stats.index_removals += 1;
        }
        let leaves = catalog.non_present_ids(&MediaType::LEAVES).await?;
        for (removed, id) in leaves.into_iter().enumerate() {
            index.expunge(IndexKind::Song, id.get()).await?;
            stats.index_removals += 1;
            self.throttle(removed + 1, batch.expunge_checkpoint).await?;
        }

        if let (Some(min), Some(max)) = (catalog.min_id().await?, catalog.max_id().await?) {
            let step = batch.expunge_range.max(1);
            let mut low = min.get();
            while low <= max.get() {
                let high = low.saturating_add(step - 1).min(max.get());
                stats.deleted_rows += catalog
                    .expunge_range(MediaFileId(low), MediaFileId(high))
                    .await?;
                catalog.commit_batch().await?;
                self.checkpoint().await?;
                if high == i64::MAX {
                    break;
                }
                low = high + 1;
            }
        }

        info!(
            target: "scan::expunge",
            pending,
            index_removals = stats.index_removals,
            deleted = stats.deleted_rows,
            "expunged non-present catalog rows"
        );
        Ok(stats)
    }

    /// Same routine for the tag-derived stratum.
    pub async fn expunge_aggregates(&self) -> Result<ExpungeStats> {
        let aggregates = &self.ports.aggregates;
        let index = &self.ports.index;
        let mut stats = ExpungeStats::default();

        for id in aggregates.non_present_album_ids().await? {
            index.expunge(IndexKind::AlbumId3, id.get()).await?;
            stats.index_removals += 1;
        }
        for id in aggregates.non_present_artist_ids().await? {
            index.expunge(IndexKind::ArtistId3, id.get()).await?;
            stats.index_removals += 1;
        }
        stats.deleted_rows += aggregates.expunge_albums().await?;
        stats.deleted_rows += aggregates.expunge_artists().await?;

        if stats.deleted_rows > 0 {
            info!(
                target: "scan::expunge",
                index_removals = stats.index_removals,
                deleted = stats.deleted_rows,
                "expunged non-present aggregates"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use strata_model::FolderId;

    use super::*;
    use crate::memory::{MemoryAuditLog, MemoryCatalog, MemoryIndex};
    use crate::ports::{CatalogRepository, SearchIndex};
    use crate::scan::state::MaintenanceKind;

    fn helper_with(
        catalog: &MemoryCatalog,
        index: &MemoryIndex,
        settings: ScannerSettings,
    ) -> ScanHelper {
        let ports = ScanPorts::in_memory(
            catalog.clone(),
            index.clone(),
            MemoryAuditLog::new(),
            Arc::new(crate::media::PathTagReader),
            &settings,
        );
        ScanHelper::new(ScanState::new(), ports, Arc::new(settings))
    }

    fn leaf(path: &str, order: i32) -> CatalogEntry {
        let mut entry = CatalogEntry::new(
            path,
            Some(Path::new(path).parent().unwrap().to_path_buf()),
            FolderId(1),
            MediaType::Music,
        );
        entry.order = order;
        entry
    }

    #[tokio::test]
    async fn reorder_writes_only_displaced_rows() {
        let catalog = MemoryCatalog::new();
        let helper = helper_with(&catalog, &MemoryIndex::new(), ScannerSettings::default());
        let mut items = vec![leaf("/m/b", 2), leaf("/m/a", 1), leaf("/m/c", 5)];
        for (n, item) in items.iter_mut().enumerate() {
            item.id = Some(MediaFileId(n as i64 + 1));
        }

        let mut writes = Vec::new();
        let rewritten = helper
            .reorder(
                items.clone(),
                |a, b| a.path.cmp(&b.path),
                |id, order| {
                    writes.push((id, order));
                    async { Ok(()) }
                },
            )
            .await
            .unwrap();
        assert_eq!(rewritten, 1);
        assert_eq!(writes, vec![(MediaFileId(3), 3)]);
    }

    #[tokio::test]
    async fn drain_stops_when_only_failures_remain() {
        let catalog = MemoryCatalog::new();
        let helper = helper_with(&catalog, &MemoryIndex::new(), ScannerSettings::default());
        let rows = vec![leaf("/m/bad", -1), leaf("/m/good", -1)];

        let mut calls = 0;
        let stats = helper
            .drain_candidates(
                1,
                0,
                |limit| {
                    calls += 1;
                    let remaining: Vec<CatalogEntry> = rows
                        .iter()
                        .filter(|row| row.path == Path::new("/m/bad") || calls < 3)
                        .take(limit)
                        .cloned()
                        .collect();
                    async move { Ok(remaining) }
                },
                |row: CatalogEntry| async move { Ok(row.path != Path::new("/m/bad")) },
            )
            .await
            .unwrap();
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn interruption_surfaces_as_error() {
        let catalog = MemoryCatalog::new();
        let helper = helper_with(&catalog, &MemoryIndex::new(), ScannerSettings::default());
        let _guard = helper.state().try_acquire(MaintenanceKind::Scan).unwrap();
        helper.state().request_cancel();
        let err = helper.checkpoint().await.unwrap_err();
        assert!(matches!(err, ScanError::Interrupted { reason } if reason == CANCELED_REASON));
        helper.state().shutdown();
        let err = helper.check_interrupted().unwrap_err();
        assert!(matches!(err, ScanError::Interrupted { reason } if reason == DESTROYED_REASON));
    }

    #[tokio::test]
    async fn expunge_removes_rows_and_documents() {
        let catalog = MemoryCatalog::new();
        let index = MemoryIndex::new();
        let mut settings = ScannerSettings::default();
        settings.batch.expunge_range = 2;
        let helper = helper_with(&catalog, &index, settings);

        catalog
            .persist(CatalogEntry::new("/m", None, FolderId(1), MediaType::Directory))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d", "e"] {
            let row = catalog
                .persist(leaf(&format!("/m/{name}"), -1))
                .await
                .unwrap()
                .unwrap();
            ids.push(row.id.unwrap());
        }
        index.start_write_session().await.unwrap();
        for id in &ids {
            let row = catalog.get_by_id(*id).await.unwrap().unwrap();
            index.index_entry(&row).await.unwrap();
        }

        let now = chrono::Utc::now();
        let keep = catalog.get_by_path(Path::new("/m")).await.unwrap().unwrap();
        catalog.touch(keep.id.unwrap(), now).await.unwrap();
        catalog.touch(ids[0], now).await.unwrap();
        assert_eq!(catalog.mark_non_present(now).await.unwrap(), 4);

        let stats = helper.expunge_non_present().await.unwrap();
        assert_eq!(stats.deleted_rows, 4);
        assert_eq!(stats.index_removals, 4);
        assert_eq!(catalog.entries().await.len(), 2);
        assert_eq!(index.count(IndexKind::Song).await, 1);
    }
}
