//! Depth-first walk of every enabled folder, one catalog row per node.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use strata_model::{CatalogEntry, MediaType, MusicFolder, ScanEventType, far_past};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::{MediaClassifier, PathTagReader};
use crate::scan::context::ScanContext;
use crate::scan::helper::{DrainStats, ScanHelper};

#[derive(Debug, Clone)]
struct ListedNode {
    path: PathBuf,
    is_dir: bool,
    size: u64,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Listing {
    directories: Vec<ListedNode>,
    files: Vec<ListedNode>,
}

/// File-structure phase: walk, deferred drains, clean-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryScanReport {
    /// Non-video nodes visited.
    pub processed: u64,
    /// Rows created or rewritten during traversal.
    pub written: usize,
    pub videos: DrainStats,
    pub podcasts: DrainStats,
    /// Rows no longer on disk, marked and expunged.
    pub removed: u64,
}

#[derive(Debug)]
pub struct DirectoryScan<'a> {
    helper: &'a ScanHelper,
    ctx: &'a ScanContext,
}

impl<'a> DirectoryScan<'a> {
    /// Bind the phase to one run.
    pub fn new(helper: &'a ScanHelper, ctx: &'a ScanContext) -> Self {
        Self { helper, ctx }
    }

    /// Walk every enabled folder, parse deferred leaves and drop vanished rows.
    pub async fn run(&self) -> Result<DirectoryScanReport> {
        let ports = self.helper.ports();
        let mut report = DirectoryScanReport::default();

        let folders = ports
            .folder_cache
            .enabled_folders(ports.folders.as_ref())
            .await?;
        for folder in &folders {
            self.helper.check_interrupted()?;
            let modified = match fs::metadata(&folder.path).await {
                Ok(meta) => modified_of(&meta),
                Err(err) => {
                    warn!(target: "scan::phase", folder = %folder.name, error = %err, "folder vanished during scan, skipping");
                    continue;
                }
            };
            info!(target: "scan::phase", run_id = %self.ctx.run_id, folder = %folder.name, "scanning folder");
            report.written += self
                .scan_directory(folder, folder.path.clone(), None, modified)
                .await?;
        }
        report.processed = self.helper.state().processed();

        self.helper
            .write_event(self.ctx, ScanEventType::ParseFileStructure, None)
            .await?;
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::ScannedCount,
                Some(report.processed.to_string()),
            )
            .await?;

        report.videos = self.drain_deferred(MediaType::Video).await?;
        self.helper
            .write_event(self.ctx, ScanEventType::ParseVideo, None)
            .await?;
        report.podcasts = self.drain_deferred(MediaType::Podcast).await?;
        self.helper
            .write_event(self.ctx, ScanEventType::ParsePodcast, None)
            .await?;

        report.removed = self.clean_up().await?;
        self.helper
            .write_event(self.ctx, ScanEventType::CleanUpFileStructure, None)
            .await?;

        info!(
            target: "scan::summary",
            run_id = %self.ctx.run_id,
            processed = report.processed,
            written = report.written,
            videos = report.videos.written,
            podcasts = report.podcasts.written,
            removed = report.removed,
            "file structure parsed"
        );
        Ok(report)
    }

    /// Sync the row for `path`, then recurse into subdirectories before
    /// registering the files. Returns the number of rows written.
    fn scan_directory<'s>(
        &'s self,
        folder: &'s MusicFolder,
        path: PathBuf,
        parent: Option<PathBuf>,
        modified: DateTime<Utc>,
    ) -> BoxFuture<'s, Result<usize>> {
        async move {
            self.helper.check_interrupted()?;
            let classifier = &self.ctx.classifier;
            let listing = match list_directory(&path, classifier).await {
                Ok(listing) => listing,
                Err(err) => {
                    let kept = self
                        .helper
                        .ports()
                        .catalog
                        .touch_subtree(&path, self.ctx.scan_date)
                        .await?;
                    warn!(target: "scan::phase", path = %path.display(), error = %err, kept, "failed to read directory, keeping catalogued subtree");
                    return Ok(0);
                }
            };

            let leaves: Vec<(ListedNode, MediaType)> = listing
                .files
                .iter()
                .filter_map(|node| {
                    classifier
                        .leaf_type(&node.path)
                        .map(|media_type| (node.clone(), media_type))
                })
                .collect();
            let media_type = if parent.is_some()
                && leaves.iter().any(|(_, media_type)| media_type.is_audio())
            {
                MediaType::Album
            } else {
                MediaType::Directory
            };
            let files: Vec<PathBuf> = listing.files.iter().map(|node| node.path.clone()).collect();
            let cover = classifier.pick_cover_art(&files);

            let mut written = 0;
            let Some(written_dir) = self
                .sync_directory(folder, &path, parent.as_deref(), modified, media_type, cover)
                .await?
            else {
                return Ok(0);
            };
            written += usize::from(written_dir);
            self.count_visited();

            for child in listing.directories {
                written += self
                    .scan_directory(folder, child.path, Some(path.clone()), child.modified)
                    .await?;
            }

            for (node, leaf_type) in leaves {
                self.helper.check_interrupted()?;
                if self.sync_file(folder, &node, &path, leaf_type).await? {
                    written += 1;
                }
                if leaf_type != MediaType::Video {
                    self.count_visited();
                }
            }
            Ok(written)
        }
        .boxed()
    }

    fn count_visited(&self) {
        let processed = self.helper.state().increment_processed();
        let every = self.helper.settings().batch.progress_interval;
        if every > 0 && processed % every == 0 {
            info!(target: "scan::progress", run_id = %self.ctx.run_id, processed, "scanning");
        }
    }

    /// `Some(true)` when the row was written, `Some(false)` when only its
    /// scan marker moved, `None` when the parent row is missing.
    async fn sync_directory(
        &self,
        folder: &MusicFolder,
        path: &Path,
        parent: Option<&Path>,
        modified: DateTime<Utc>,
        media_type: MediaType,
        cover: Option<PathBuf>,
    ) -> Result<Option<bool>> {
        let catalog = &self.helper.ports().catalog;
        let scan_date = self.ctx.scan_date;
        let existing = catalog.get_by_path(path).await?;

        if let Some(entry) = &existing
            && let Some(id) = entry.id
            && entry.present
            && !self.ctx.ignore_timestamps()
            && entry.changed == modified
            && entry.media_type == media_type
            && entry.cover_art_path == cover
        {
            catalog.touch(id, scan_date).await?;
            return Ok(Some(false));
        }

        let fresh = existing.is_none();
        let mut entry = existing.unwrap_or_else(|| {
            CatalogEntry::new(path, parent.map(Path::to_path_buf), folder.id, media_type)
        });
        entry.parent_path = parent.map(Path::to_path_buf);
        entry.folder_id = folder.id;
        entry.media_type = media_type;
        entry.cover_art_path = cover;
        entry.changed = modified;
        entry.last_scanned = scan_date;
        entry.present = true;
        if fresh {
            entry.created = scan_date;
        }
        if media_type == MediaType::Album {
            entry.children_last_updated = far_past();
        } else {
            entry.title = Some(if parent.is_none() {
                folder.name.clone()
            } else {
                entry.file_name()
            });
            entry.children_last_updated = scan_date;
            entry.parsed_at = Some(scan_date);
        }

        let Some(saved) = catalog.persist(entry).await? else {
            warn!(target: "scan::phase", path = %path.display(), "parent row missing, directory not registered");
            return Ok(None);
        };
        self.helper.ports().index.index_entry(&saved).await?;
        Ok(Some(true))
    }

    /// Register one leaf. Non-deferred audio is parsed inline; videos and
    /// podcast episodes are left for their drain loops.
    async fn sync_file(
        &self,
        folder: &MusicFolder,
        node: &ListedNode,
        parent: &Path,
        media_type: MediaType,
    ) -> Result<bool> {
        let catalog = &self.helper.ports().catalog;
        let scan_date = self.ctx.scan_date;
        let existing = catalog.get_by_path(&node.path).await?;

        if let Some(entry) = &existing
            && let Some(id) = entry.id
            && entry.present
            && !self.ctx.ignore_timestamps()
            && entry.changed == node.modified
            && entry.file_size == Some(node.size)
            && entry.media_type == media_type
            && (media_type.is_deferred() || entry.is_parsed())
        {
            catalog.touch(id, scan_date).await?;
            return Ok(false);
        }

        let fresh = existing.is_none();
        let mut entry = existing.unwrap_or_else(|| {
            CatalogEntry::new(&node.path, Some(parent.to_path_buf()), folder.id, media_type)
        });
        entry.parent_path = Some(parent.to_path_buf());
        entry.folder_id = folder.id;
        entry.media_type = media_type;
        entry.format = MediaClassifier::format(&node.path);
        entry.file_size = Some(node.size);
        entry.changed = node.modified;
        entry.last_scanned = scan_date;
        entry.present = true;
        if fresh {
            entry.created = scan_date;
        }
        if media_type.is_deferred() {
            entry.parsed_at = None;
        } else {
            self.read_tags(&mut entry).await;
        }

        let Some(saved) = catalog.persist(entry).await? else {
            warn!(target: "scan::phase", path = %node.path.display(), "parent row missing, file not registered");
            return Ok(false);
        };
        self.helper.ports().index.index_entry(&saved).await?;
        catalog.mark_children_dirty(parent).await?;
        Ok(true)
    }

    /// Apply tags to `entry`. A read failure falls back to path-derived
    /// fields and leaves the entry unparsed so the next run retries it.
    async fn read_tags(&self, entry: &mut CatalogEntry) {
        match self.helper.ports().tags.read_tags(&entry.path).await {
            Ok(tags) => {
                tags.apply_to(entry);
                entry.parsed_at = Some(self.ctx.scan_date);
            }
            Err(err) => {
                warn!(target: "scan::phase", path = %entry.path.display(), error = %err, "unreadable tags, using path-derived metadata");
                PathTagReader::derive(&entry.path).apply_to(entry);
                entry.parsed_at = None;
            }
        }
    }

    async fn drain_deferred(&self, media_type: MediaType) -> Result<DrainStats> {
        let catalog = &self.helper.ports().catalog;
        let batch = &self.helper.settings().batch;
        let stats = self
            .helper
            .drain_candidates(
                batch.candidate_batch_size,
                batch.album_checkpoint,
                |limit| catalog.fetch_unregistered(media_type, limit),
                |entry| self.parse_deferred(entry),
            )
            .await?;
        debug!(target: "scan::phase", %media_type, written = stats.written, skipped = stats.skipped, "deferred entries parsed");
        Ok(stats)
    }

    async fn parse_deferred(&self, mut entry: CatalogEntry) -> Result<bool> {
        if entry.media_type == MediaType::Video {
            if entry.title.is_none() {
                entry.title = Some(entry.display_name());
            }
        } else {
            match self.helper.ports().tags.read_tags(&entry.path).await {
                Ok(tags) => tags.apply_to(&mut entry),
                Err(err) => {
                    warn!(target: "scan::phase", path = %entry.path.display(), error = %err, "unreadable tags, episode left unparsed");
                    return Ok(false);
                }
            }
        }
        entry.parsed_at = Some(self.ctx.scan_date);

        let ports = self.helper.ports();
        let Some(saved) = ports.catalog.persist(entry).await? else {
            return Ok(false);
        };
        ports.index.index_entry(&saved).await?;
        if let Some(parent) = &saved.parent_path {
            ports.catalog.mark_children_dirty(parent).await?;
        }
        Ok(true)
    }

    /// Mark every row this run did not touch as non-present, then expunge.
    async fn clean_up(&self) -> Result<u64> {
        let marked = self
            .helper
            .ports()
            .catalog
            .mark_non_present(self.ctx.scan_date)
            .await?;
        if marked > 0 {
            info!(target: "scan::phase", run_id = %self.ctx.run_id, marked, "entries no longer on disk");
        }
        let stats = self.helper.expunge_non_present().await?;
        Ok(stats.deleted_rows)
    }
}

fn modified_of(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .ok()
        .filter(|time| *time >= UNIX_EPOCH)
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(far_past)
}

/// Children of `path` that the classifier keeps, sorted by path. Fails only
/// when `path` itself cannot be read; unreadable entries are logged and
/// skipped.
async fn list_directory(path: &Path, classifier: &MediaClassifier) -> std::io::Result<Listing> {
    let mut listing = Listing::default();
    let mut dir = fs::read_dir(path).await?;

    while let Some(entry_res) = dir.next_entry().await.transpose() {
        let entry = match entry_res {
            Ok(entry) => entry,
            Err(err) => {
                warn!(target: "scan::phase", path = %path.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let child = entry.path();
        if classifier.is_excluded(&child) {
            continue;
        }
        let meta = match fs::metadata(&child).await {
            Ok(meta) => meta,
            Err(err) => {
                warn!(target: "scan::phase", path = %child.display(), error = %err, "skipping entry due to metadata error");
                continue;
            }
        };
        let node = ListedNode {
            is_dir: meta.is_dir(),
            size: meta.len(),
            modified: modified_of(&meta),
            path: child,
        };
        if node.is_dir {
            listing.directories.push(node);
        } else if meta.is_file() {
            listing.files.push(node);
        }
    }

    listing.directories.sort_by(|a, b| a.path.cmp(&b.path));
    listing.files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(listing)
}
