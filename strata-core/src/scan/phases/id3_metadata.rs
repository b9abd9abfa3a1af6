//! Tag-hierarchy aggregates rebuilt from the present catalog rows.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use strata_model::{Album, Artist, Genre, ScanEventType};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ports::{CandidateKind, Id3AlbumCandidate, Id3ArtistCandidate};
use crate::scan::context::ScanContext;
use crate::scan::helper::ScanHelper;
use crate::scan::ordering::{UpstreamChanges, should_recompute_ordering};

/// Counters from the tag-aggregate phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Id3MetadataReport {
    pub albums_written: usize,
    pub artists_written: usize,
    /// Aggregates that lost every qualifying track this run.
    pub albums_retired: u64,
    pub artists_retired: u64,
    pub album_orders: Option<usize>,
    pub artist_orders: Option<usize>,
    pub album_counts_updated: usize,
    pub genres: usize,
}

/// Rebuilds the tag-derived artist and album aggregates.
#[derive(Debug)]
pub struct Id3MetadataScan<'a> {
    helper: &'a ScanHelper,
    ctx: &'a ScanContext,
}

impl<'a> Id3MetadataScan<'a> {
    /// Bind the phase to one run.
    pub fn new(helper: &'a ScanHelper, ctx: &'a ScanContext) -> Self {
        Self { helper, ctx }
    }

    /// Retire, refresh and reorder aggregates, then album counts and genres.
    pub async fn run(&self) -> Result<Id3MetadataReport> {
        let aggregates = &self.helper.ports().aggregates;
        let batch = &self.helper.settings().batch;
        let mut report = Id3MetadataReport::default();
        let folders_touched = self.helper.folders_touched(self.ctx).await?;

        report.albums_retired = aggregates.iterate_albums(self.ctx.scan_date).await?;
        self.helper.expunge_aggregates().await?;
        for kind in [CandidateKind::Changed, CandidateKind::Unregistered] {
            let stats = self
                .helper
                .drain_candidates(
                    batch.candidate_batch_size,
                    batch.album_id3_checkpoint,
                    |limit| aggregates.fetch_album_candidates(kind, limit),
                    |candidate| self.refresh_album(candidate),
                )
                .await?;
            report.albums_written += stats.written;
        }
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::RefreshAlbumId3,
                Some(report.albums_written.to_string()),
            )
            .await?;

        let upstream = UpstreamChanges {
            aggregates_written: report.albums_written + report.albums_retired as usize,
            unordered: aggregates.count_unordered_albums().await?,
            folders_touched,
            ..UpstreamChanges::default()
        };
        report.album_orders = self.order_albums(&upstream).await?;

        report.artists_retired = aggregates.iterate_artists(self.ctx.scan_date).await?;
        self.helper.expunge_aggregates().await?;
        for kind in [CandidateKind::Changed, CandidateKind::Unregistered] {
            let stats = self
                .helper
                .drain_candidates(
                    batch.candidate_batch_size,
                    batch.artist_id3_checkpoint,
                    |limit| aggregates.fetch_artist_candidates(kind, limit),
                    |candidate| self.refresh_artist(candidate),
                )
                .await?;
            report.artists_written += stats.written;
        }
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::RefreshArtistId3,
                Some(report.artists_written.to_string()),
            )
            .await?;

        let upstream = UpstreamChanges {
            aggregates_written: report.artists_written + report.artists_retired as usize,
            unordered: aggregates.count_unordered_artists().await?,
            folders_touched,
            ..UpstreamChanges::default()
        };
        report.artist_orders = self.order_artists(&upstream).await?;

        report.album_counts_updated = self.update_album_counts().await?;
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::UpdateAlbumCounts,
                Some(report.album_counts_updated.to_string()),
            )
            .await?;

        report.genres = self.update_genre_master().await?;
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::UpdateGenreMaster,
                Some(report.genres.to_string()),
            )
            .await?;

        info!(
            target: "scan::summary",
            run_id = %self.ctx.run_id,
            albums = report.albums_written,
            artists = report.artists_written,
            retired_albums = report.albums_retired,
            retired_artists = report.artists_retired,
            genres = report.genres,
            "tag aggregates refreshed"
        );
        Ok(report)
    }

    async fn refresh_album(&self, candidate: Id3AlbumCandidate) -> Result<bool> {
        let ports = self.helper.ports();
        let rep = &candidate.representative;
        let existing = ports
            .aggregates
            .get_album(&candidate.artist, &candidate.album)
            .await?;
        let fresh = existing.is_none();
        let mut album = existing.unwrap_or_else(|| {
            Album::new(candidate.artist.clone(), candidate.album.clone(), rep.folder_id)
        });

        album.sort_name = rep.album_sort.clone();
        album.artist_sort = rep.effective_album_artist_sort().map(str::to_string);
        album.song_count = candidate.song_count;
        album.duration_seconds = candidate.duration_seconds;
        album.year = rep.year;
        album.genre = rep.genre.clone();
        album.folder_id = rep.folder_id;
        album.cover_art_path = self.cover_from_ancestors(rep.parent_path.as_deref()).await?;
        album.present = true;
        album.last_scanned = self.ctx.scan_date;
        album.changed = self.ctx.scan_date;
        if fresh {
            album.created = self.ctx.scan_date;
        }

        let Some(saved) = ports.aggregates.persist_album(album).await? else {
            warn!(target: "scan::phase", artist = %candidate.artist, album = %candidate.album, "album aggregate rejected");
            return Ok(false);
        };
        ports.index.index_album(&saved).await?;
        Ok(true)
    }

    async fn refresh_artist(&self, candidate: Id3ArtistCandidate) -> Result<bool> {
        let ports = self.helper.ports();
        let rep = &candidate.representative;
        let mut artist = ports
            .aggregates
            .get_artist(&candidate.name)
            .await?
            .unwrap_or_else(|| Artist::new(candidate.name.clone(), rep.folder_id));

        artist.sort_name = rep.effective_album_artist_sort().map(str::to_string);
        let reading_source = artist.sort_name.as_deref().unwrap_or(&artist.name);
        artist.music_index = self
            .ctx
            .music_index
            .bucket(&ports.collator, reading_source);
        artist.folder_id = rep.folder_id;
        let album_dir = rep.parent_path.as_deref();
        let artist_dir = album_dir.and_then(Path::parent);
        artist.cover_art_path = match self.cover_from_ancestors(artist_dir).await? {
            Some(cover) => Some(cover),
            None => self.cover_from_ancestors(album_dir).await?,
        };
        artist.present = true;
        artist.last_scanned = self.ctx.scan_date;
        artist.changed = self.ctx.scan_date;

        let Some(saved) = ports.aggregates.persist_artist(artist).await? else {
            warn!(target: "scan::phase", artist = %candidate.name, "artist aggregate rejected");
            return Ok(false);
        };
        ports.index.index_artist(&saved).await?;
        Ok(true)
    }

    /// Nearest cover image recorded on `start` or one of its ancestors.
    async fn cover_from_ancestors(&self, start: Option<&Path>) -> Result<Option<PathBuf>> {
        let catalog = &self.helper.ports().catalog;
        let mut current = start.map(Path::to_path_buf);
        while let Some(path) = current {
            let Some(entry) = catalog.get_by_path(&path).await? else {
                return Ok(None);
            };
            if entry.cover_art_path.is_some() {
                return Ok(entry.cover_art_path);
            }
            current = entry.parent_path;
        }
        Ok(None)
    }

    async fn order_albums(&self, upstream: &UpstreamChanges) -> Result<Option<usize>> {
        let tag = ScanEventType::UpdateOrderOfAlbumId3;
        if !should_recompute_ordering(self.ctx, upstream) {
            self.helper.write_skipped(self.ctx, tag).await?;
            return Ok(None);
        }
        let ports = self.helper.ports();
        let collator = ports.collator.as_ref();
        let rewritten = self
            .helper
            .reorder(
                ports.aggregates.present_albums().await?,
                |a, b| {
                    collator
                        .compare_sortable(
                            (&a.name, a.sort_name.as_deref()),
                            (&b.name, b.sort_name.as_deref()),
                        )
                        .then_with(|| {
                            collator.compare_sortable(
                                (&a.artist, a.artist_sort.as_deref()),
                                (&b.artist, b.artist_sort.as_deref()),
                            )
                        })
                },
                |id, order| ports.aggregates.update_album_order(id, order),
            )
            .await?;
        self.helper
            .write_event(self.ctx, tag, Some(rewritten.to_string()))
            .await?;
        Ok(Some(rewritten))
    }

    async fn order_artists(&self, upstream: &UpstreamChanges) -> Result<Option<usize>> {
        let tag = ScanEventType::UpdateOrderOfArtistId3;
        if !should_recompute_ordering(self.ctx, upstream) {
            self.helper.write_skipped(self.ctx, tag).await?;
            return Ok(None);
        }
        let ports = self.helper.ports();
        let collator = ports.collator.as_ref();
        let rewritten = self
            .helper
            .reorder(
                ports.aggregates.present_artists().await?,
                |a, b| {
                    collator.compare_sortable(
                        (&a.name, a.sort_name.as_deref()),
                        (&b.name, b.sort_name.as_deref()),
                    )
                },
                |id, order| ports.aggregates.update_artist_order(id, order),
            )
            .await?;
        self.helper
            .write_event(self.ctx, tag, Some(rewritten.to_string()))
            .await?;
        Ok(Some(rewritten))
    }

    /// Align each artist's album count with the present albums under its name.
    async fn update_album_counts(&self) -> Result<usize> {
        let aggregates = &self.helper.ports().aggregates;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for album in aggregates.present_albums().await? {
            *counts.entry(album.artist).or_default() += 1;
        }
        let mut updated = 0;
        for artist in aggregates.present_artists().await? {
            let Some(id) = artist.id else {
                continue;
            };
            let count = counts.get(&artist.name).copied().unwrap_or(0);
            if artist.album_count != count {
                aggregates.update_album_count(id, count).await?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Rebuild the genre list from song and album counts and prune index
    /// entries for genres that disappeared.
    async fn update_genre_master(&self) -> Result<usize> {
        let ports = self.helper.ports();
        let mut genres: BTreeMap<String, Genre> = BTreeMap::new();
        for (name, songs) in ports.catalog.genre_song_counts().await? {
            genres.entry(name.clone()).or_insert_with(|| Genre::new(name)).song_count = songs;
        }
        for album in ports.aggregates.present_albums().await? {
            let Some(name) = album.genre.as_deref().map(str::trim).filter(|g| !g.is_empty())
            else {
                continue;
            };
            genres
                .entry(name.to_string())
                .or_insert_with(|| Genre::new(name))
                .album_count += 1;
        }
        let genres: Vec<Genre> = genres.into_values().collect();

        let previous = ports.aggregates.genres().await?;
        if previous != genres || self.ctx.ignore_timestamps() {
            ports.aggregates.replace_genres(genres.clone()).await?;
            for genre in &genres {
                ports.index.index_genre(genre).await?;
            }
            let keep: HashSet<String> = genres.iter().map(|g| g.name.clone()).collect();
            ports.index.expunge_genres(&keep).await?;
            debug!(target: "scan::phase", genres = genres.len(), "genre master rebuilt");
        }
        Ok(genres.len())
    }
}
