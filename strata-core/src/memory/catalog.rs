use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_model::{
    Album, AlbumId, Artist, ArtistId, CatalogEntry, FolderId, Genre, LibraryStatistics,
    MediaFileId, MediaType, MusicFolder, Playlist, PlaylistId, UNORDERED, far_past,
};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::ports::{
    AggregateRepository, CandidateKind, CatalogRepository, Id3AlbumCandidate,
    Id3ArtistCandidate, MusicFolderRepository, PlaylistRepository, SortScope, SortSource,
    SortTuple, SortUpdate,
};
use crate::sort::compare_tracks;

#[derive(Debug, Default)]
struct CatalogState {
    next_entry_id: i64,
    entries: BTreeMap<MediaFileId, CatalogEntry>,
    by_path: HashMap<PathBuf, MediaFileId>,
    next_artist_id: i64,
    artists: BTreeMap<ArtistId, Artist>,
    next_album_id: i64,
    albums: BTreeMap<AlbumId, Album>,
    folders: BTreeMap<FolderId, MusicFolder>,
    genres: Vec<Genre>,
    statistics: BTreeMap<FolderId, LibraryStatistics>,
    next_playlist_id: i64,
    playlists: BTreeMap<PlaylistId, Playlist>,
    checkpoints: u64,
    batches: u64,
}

type AlbumKey = (String, String);

impl CatalogState {
    /// Present music rows that feed the tag-derived stratum.
    fn qualifying_tracks(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(|entry| {
            entry.present
                && entry.media_type == MediaType::Music
                && entry.effective_album_artist().is_some()
        })
    }

    fn album_groups(&self) -> BTreeMap<AlbumKey, Vec<&CatalogEntry>> {
        let mut groups: BTreeMap<AlbumKey, Vec<&CatalogEntry>> = BTreeMap::new();
        for track in self.qualifying_tracks() {
            let (Some(artist), Some(album)) = (
                track.effective_album_artist(),
                track
                    .album_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty()),
            ) else {
                continue;
            };
            groups
                .entry((artist.to_string(), album.to_string()))
                .or_default()
                .push(track);
        }
        for tracks in groups.values_mut() {
            tracks.sort_by(|a, b| compare_tracks(a, b));
        }
        groups
    }

    fn artist_groups(&self) -> BTreeMap<String, Vec<&CatalogEntry>> {
        let mut groups: BTreeMap<String, Vec<&CatalogEntry>> = BTreeMap::new();
        for track in self.qualifying_tracks() {
            if let Some(artist) = track.effective_album_artist() {
                groups.entry(artist.to_string()).or_default().push(track);
            }
        }
        for tracks in groups.values_mut() {
            tracks.sort_by(|a, b| a.path.cmp(&b.path));
        }
        groups
    }

    fn album_id_by_key(&self, artist: &str, name: &str) -> Option<AlbumId> {
        self.albums
            .iter()
            .find(|(_, album)| album.artist == artist && album.name == name)
            .map(|(id, _)| *id)
    }

    fn artist_id_by_name(&self, name: &str) -> Option<ArtistId> {
        self.artists
            .iter()
            .find(|(_, artist)| artist.name == name)
            .map(|(id, _)| *id)
    }

    fn entry_by_path_mut(&mut self, path: &Path) -> Option<&mut CatalogEntry> {
        let id = self.by_path.get(path).copied()?;
        self.entries.get_mut(&id)
    }

    /// Nearest cover image recorded on `start` or one of its ancestors.
    fn cover_from_ancestors(&self, start: Option<&Path>) -> Option<PathBuf> {
        let mut current = start;
        while let Some(path) = current {
            let entry = self.by_path.get(path).and_then(|id| self.entries.get(id))?;
            if entry.cover_art_path.is_some() {
                return entry.cover_art_path.clone();
            }
            current = entry.parent_path.as_deref();
        }
        None
    }

    /// Whether the album fields derived from `rep` no longer match the
    /// stored aggregate.
    fn album_diverges(&self, aggregate: &Album, rep: &CatalogEntry) -> bool {
        aggregate.sort_name != rep.album_sort
            || aggregate.artist_sort.as_deref() != rep.effective_album_artist_sort()
            || aggregate.year != rep.year
            || aggregate.genre != rep.genre
            || aggregate.folder_id != rep.folder_id
            || aggregate.cover_art_path != self.cover_from_ancestors(rep.parent_path.as_deref())
    }

    fn artist_diverges(&self, aggregate: &Artist, rep: &CatalogEntry) -> bool {
        let album_dir = rep.parent_path.as_deref();
        let cover = self
            .cover_from_ancestors(album_dir.and_then(Path::parent))
            .or_else(|| self.cover_from_ancestors(album_dir));
        aggregate.sort_name.as_deref() != rep.effective_album_artist_sort()
            || aggregate.folder_id != rep.folder_id
            || aggregate.cover_art_path != cover
    }
}

/// In-process catalog store implementing every repository port the scan
/// pipeline writes to. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("MemoryCatalog");
        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("entries", &state.entries.len())
                    .field("artists", &state.artists.len())
                    .field("albums", &state.albums.len())
                    .field("folders", &state.folders.len());
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a music folder. Ids are assigned in insertion order.
    pub async fn add_folder(
        &self,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> MusicFolder {
        let mut state = self.state.lock().await;
        let next = state
            .folders
            .keys()
            .next_back()
            .map(|id| id.get() + 1)
            .unwrap_or(1);
        let folder = MusicFolder::new(FolderId(next), path, name);
        state.folders.insert(folder.id, folder.clone());
        folder
    }

    /// Every catalog row, present or not.
    pub async fn entries(&self) -> Vec<CatalogEntry> {
        self.state.lock().await.entries.values().cloned().collect()
    }

    pub async fn entry(&self, path: impl AsRef<Path>) -> Option<CatalogEntry> {
        let state = self.state.lock().await;
        let id = state.by_path.get(path.as_ref())?;
        state.entries.get(id).cloned()
    }

    /// Every album row, present or not.
    pub async fn albums(&self) -> Vec<Album> {
        self.state.lock().await.albums.values().cloned().collect()
    }

    /// Every artist row, present or not.
    pub async fn artists(&self) -> Vec<Artist> {
        self.state.lock().await.artists.values().cloned().collect()
    }

    pub async fn statistics(&self) -> Vec<LibraryStatistics> {
        self.state.lock().await.statistics.values().cloned().collect()
    }

    /// Checkpoints issued so far.
    pub async fn checkpoints(&self) -> u64 {
        self.state.lock().await.checkpoints
    }

    pub async fn committed_batches(&self) -> u64 {
        self.state.lock().await.batches
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn get_by_path(&self, path: &Path) -> Result<Option<CatalogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .by_path
            .get(path)
            .and_then(|id| state.entries.get(id))
            .cloned())
    }

    async fn get_by_id(&self, id: MediaFileId) -> Result<Option<CatalogEntry>> {
        Ok(self.state.lock().await.entries.get(&id).cloned())
    }

    async fn get_children(&self, parent: &Path) -> Result<Vec<CatalogEntry>> {
        let state = self.state.lock().await;
        let mut children: Vec<CatalogEntry> = state
            .entries
            .values()
            .filter(|entry| entry.present && entry.parent_path.as_deref() == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    async fn persist(&self, mut entry: CatalogEntry) -> Result<Option<CatalogEntry>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(parent) = &entry.parent_path
            && !state.by_path.contains_key(parent)
        {
            return Ok(None);
        }

        let existing = entry
            .id
            .filter(|id| state.entries.contains_key(id))
            .or_else(|| state.by_path.get(&entry.path).copied());
        let id = match existing {
            Some(id) => id,
            None => {
                state.next_entry_id += 1;
                MediaFileId(state.next_entry_id)
            }
        };

        if let Some(previous) = state.entries.get(&id)
            && previous.path != entry.path
        {
            state.by_path.remove(&previous.path);
        }

        entry.id = Some(id);
        state.by_path.insert(entry.path.clone(), id);
        state.entries.insert(id, entry.clone());
        Ok(Some(entry))
    }

    async fn touch(&self, id: MediaFileId, scan_date: DateTime<Utc>) -> Result<()> {
        if let Some(entry) = self.state.lock().await.entries.get_mut(&id) {
            entry.last_scanned = scan_date;
        }
        Ok(())
    }

    async fn touch_subtree(&self, root: &Path, scan_date: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for entry in state.entries.values_mut() {
            if entry.present && entry.path.starts_with(root) {
                entry.last_scanned = scan_date;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn mark_children_dirty(&self, parent: &Path) -> Result<()> {
        if let Some(entry) = self.state.lock().await.entry_by_path_mut(parent) {
            entry.children_last_updated = far_past();
        }
        Ok(())
    }

    async fn fetch_changed(
        &self,
        media_type: MediaType,
        batch_size: usize,
    ) -> Result<Vec<CatalogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .values()
            .filter(|entry| {
                entry.present
                    && entry.media_type == media_type
                    && entry.media_type.is_container()
                    && entry.is_parsed()
                    && entry.children_dirty()
            })
            .take(batch_size)
            .cloned()
            .collect())
    }

    async fn fetch_unregistered(
        &self,
        media_type: MediaType,
        batch_size: usize,
    ) -> Result<Vec<CatalogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .values()
            .filter(|entry| {
                entry.present && entry.media_type == media_type && !entry.is_parsed()
            })
            .take(batch_size)
            .cloned()
            .collect())
    }

    async fn mark_non_present(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let mut parents = HashSet::new();
        let mut marked = 0;
        for entry in state.entries.values_mut() {
            if entry.present && entry.last_scanned < as_of {
                entry.present = false;
                marked += 1;
                if let Some(parent) = &entry.parent_path {
                    parents.insert(parent.clone());
                }
            }
        }
        for parent in parents {
            if let Some(entry) = state.entry_by_path_mut(&parent)
                && entry.present
            {
                entry.children_last_updated = far_past();
            }
        }
        Ok(marked)
    }

    async fn non_present_ids(&self, media_types: &[MediaType]) -> Result<Vec<MediaFileId>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.present && media_types.contains(&entry.media_type))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn count_non_present(&self) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.entries.values().filter(|entry| !entry.present).count() as u64)
    }

    async fn min_id(&self) -> Result<Option<MediaFileId>> {
        Ok(self.state.lock().await.entries.keys().next().copied())
    }

    async fn max_id(&self) -> Result<Option<MediaFileId>> {
        Ok(self.state.lock().await.entries.keys().next_back().copied())
    }

    async fn expunge_range(&self, min: MediaFileId, max: MediaFileId) -> Result<u64> {
        if min > max {
            return Ok(0);
        }
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let doomed: Vec<MediaFileId> = state
            .entries
            .range(min..=max)
            .filter(|(_, entry)| !entry.present)
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            if let Some(entry) = state.entries.remove(id) {
                state.by_path.remove(&entry.path);
            }
        }
        Ok(doomed.len() as u64)
    }

    async fn update_order(&self, id: MediaFileId, order: i32) -> Result<()> {
        if let Some(entry) = self.state.lock().await.entries.get_mut(&id) {
            entry.order = order;
        }
        Ok(())
    }

    async fn present_of_type(&self, media_type: MediaType) -> Result<Vec<CatalogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .values()
            .filter(|entry| entry.present && entry.media_type == media_type && !entry.is_root())
            .cloned()
            .collect())
    }

    async fn count_unordered(&self, media_types: &[MediaType]) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .values()
            .filter(|entry| {
                entry.present
                    && !entry.is_root()
                    && entry.order == UNORDERED
                    && media_types.contains(&entry.media_type)
            })
            .count() as u64)
    }

    async fn reset_scan_markers(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut reset = 0;
        for entry in state.entries.values_mut() {
            entry.last_scanned = far_past();
            entry.children_last_updated = far_past();
            entry.parsed_at = None;
            reset += 1;
        }
        Ok(reset)
    }

    async fn sort_tuples(&self, scope: SortScope) -> Result<Vec<SortTuple>> {
        let state = self.state.lock().await;
        let mut tuples = Vec::new();
        for (id, entry) in state.entries.iter().filter(|(_, e)| e.present) {
            let fields: Vec<(SortSource, &Option<String>, &Option<String>)> = match scope {
                SortScope::Album => {
                    vec![(SortSource::Album, &entry.album_name, &entry.album_sort)]
                }
                SortScope::Artist => vec![
                    (
                        SortSource::AlbumArtist,
                        &entry.album_artist,
                        &entry.album_artist_sort,
                    ),
                    (SortSource::Artist, &entry.artist, &entry.artist_sort),
                    (SortSource::Composer, &entry.composer, &entry.composer_sort),
                ],
            };
            for (source, name, sort) in fields {
                let Some(name) = name.as_deref().filter(|n| !n.trim().is_empty()) else {
                    continue;
                };
                tuples.push(SortTuple {
                    id: *id,
                    name: name.to_string(),
                    sort: sort.clone(),
                    source,
                    changed: entry.changed,
                });
            }
        }
        Ok(tuples)
    }

    async fn update_sort(&self, update: &SortUpdate) -> Result<()> {
        if let Some(entry) = self.state.lock().await.entries.get_mut(&update.id) {
            let field = match update.source {
                SortSource::AlbumArtist => &mut entry.album_artist_sort,
                SortSource::Artist => &mut entry.artist_sort,
                SortSource::Composer => &mut entry.composer_sort,
                SortSource::Album => &mut entry.album_sort,
            };
            *field = Some(update.sort.clone());
        }
        Ok(())
    }

    async fn genre_song_counts(&self) -> Result<Vec<(String, u32)>> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for entry in state
            .entries
            .values()
            .filter(|e| e.present && e.media_type == MediaType::Music)
        {
            if let Some(genre) = entry.genre.as_deref().filter(|g| !g.trim().is_empty()) {
                *counts.entry(genre.trim().to_string()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn folder_statistics(
        &self,
        folder_id: FolderId,
        scan_date: DateTime<Utc>,
    ) -> Result<LibraryStatistics> {
        let state = self.state.lock().await;
        let mut stats = LibraryStatistics {
            folder_id,
            scan_date,
            artist_count: 0,
            album_count: 0,
            song_count: 0,
            video_count: 0,
            total_size_bytes: 0,
            total_duration_seconds: 0,
        };
        let mut artists = BTreeSet::new();
        for entry in state
            .entries
            .values()
            .filter(|e| e.present && e.folder_id == folder_id)
        {
            match entry.media_type {
                MediaType::Album => stats.album_count += 1,
                MediaType::Music => {
                    stats.song_count += 1;
                    if let Some(artist) = entry.effective_album_artist() {
                        artists.insert(artist.to_string());
                    }
                }
                MediaType::Video => stats.video_count += 1,
                _ => {}
            }
            if entry.media_type.is_leaf() {
                stats.total_size_bytes += entry.file_size.unwrap_or(0);
                stats.total_duration_seconds += u64::from(entry.duration_seconds.unwrap_or(0));
            }
        }
        stats.artist_count = artists.len() as u32;
        Ok(stats)
    }

    async fn save_statistics(&self, statistics: LibraryStatistics) -> Result<()> {
        self.state
            .lock()
            .await
            .statistics
            .insert(statistics.folder_id, statistics);
        Ok(())
    }

    async fn checkpoint(&self) -> Result<()> {
        self.state.lock().await.checkpoints += 1;
        Ok(())
    }

    async fn commit_batch(&self) -> Result<()> {
        self.state.lock().await.batches += 1;
        Ok(())
    }
}

#[async_trait]
impl AggregateRepository for MemoryCatalog {
    async fn fetch_album_candidates(
        &self,
        kind: CandidateKind,
        batch_size: usize,
    ) -> Result<Vec<Id3AlbumCandidate>> {
        let state = self.state.lock().await;
        let mut candidates = Vec::new();
        for ((artist, album), tracks) in state.album_groups() {
            if candidates.len() >= batch_size {
                break;
            }
            let Some(representative) = tracks.first() else {
                continue;
            };
            let song_count = tracks.len() as u32;
            let duration_seconds: u64 = tracks
                .iter()
                .map(|track| u64::from(track.duration_seconds.unwrap_or(0)))
                .sum();
            let existing = state
                .albums
                .values()
                .find(|a| a.present && a.artist == artist && a.name == album);
            let wanted = match (kind, existing) {
                (CandidateKind::Unregistered, None) => true,
                (CandidateKind::Changed, Some(aggregate)) => {
                    aggregate.song_count != song_count
                        || aggregate.duration_seconds != duration_seconds
                        || tracks
                            .iter()
                            .any(|t| t.parsed_at.is_some_and(|p| p > aggregate.changed))
                        || state.album_diverges(aggregate, representative)
                }
                _ => false,
            };
            if wanted {
                candidates.push(Id3AlbumCandidate {
                    representative: (*representative).clone(),
                    artist,
                    album,
                    song_count,
                    duration_seconds,
                });
            }
        }
        Ok(candidates)
    }

    async fn fetch_artist_candidates(
        &self,
        kind: CandidateKind,
        batch_size: usize,
    ) -> Result<Vec<Id3ArtistCandidate>> {
        let state = self.state.lock().await;
        let mut candidates = Vec::new();
        for (name, tracks) in state.artist_groups() {
            if candidates.len() >= batch_size {
                break;
            }
            let Some(representative) = tracks.first() else {
                continue;
            };
            let existing = state
                .artists
                .values()
                .find(|a| a.present && a.name == name);
            let wanted = match (kind, existing) {
                (CandidateKind::Unregistered, None) => true,
                (CandidateKind::Changed, Some(aggregate)) => {
                    tracks
                        .iter()
                        .any(|t| t.parsed_at.is_some_and(|p| p > aggregate.changed))
                        || state.artist_diverges(aggregate, representative)
                }
                _ => false,
            };
            if wanted {
                candidates.push(Id3ArtistCandidate {
                    representative: (*representative).clone(),
                    name,
                });
            }
        }
        Ok(candidates)
    }

    async fn get_album(&self, artist: &str, name: &str) -> Result<Option<Album>> {
        let state = self.state.lock().await;
        Ok(state
            .album_id_by_key(artist, name)
            .and_then(|id| state.albums.get(&id))
            .cloned())
    }

    async fn get_artist(&self, name: &str) -> Result<Option<Artist>> {
        let state = self.state.lock().await;
        Ok(state
            .artist_id_by_name(name)
            .and_then(|id| state.artists.get(&id))
            .cloned())
    }

    async fn persist_album(&self, mut album: Album) -> Result<Option<Album>> {
        let mut state = self.state.lock().await;
        let existing = album
            .id
            .filter(|id| state.albums.contains_key(id))
            .or_else(|| state.album_id_by_key(&album.artist, &album.name));
        let id = match existing {
            Some(id) => id,
            None => {
                state.next_album_id += 1;
                AlbumId(state.next_album_id)
            }
        };
        album.id = Some(id);
        state.albums.insert(id, album.clone());
        Ok(Some(album))
    }

    async fn persist_artist(&self, mut artist: Artist) -> Result<Option<Artist>> {
        let mut state = self.state.lock().await;
        let existing = artist
            .id
            .filter(|id| state.artists.contains_key(id))
            .or_else(|| state.artist_id_by_name(&artist.name));
        let id = match existing {
            Some(id) => id,
            None => {
                state.next_artist_id += 1;
                ArtistId(state.next_artist_id)
            }
        };
        artist.id = Some(id);
        state.artists.insert(id, artist.clone());
        Ok(Some(artist))
    }

    async fn iterate_albums(&self, scan_date: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let keys: HashSet<AlbumKey> = state.album_groups().into_keys().collect();
        let mut marked = 0;
        for album in state.albums.values_mut() {
            if keys.contains(&(album.artist.clone(), album.name.clone())) {
                album.present = true;
                album.last_scanned = scan_date;
            } else if album.present {
                album.present = false;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn iterate_artists(&self, scan_date: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let names: HashSet<String> = state.artist_groups().into_keys().collect();
        let mut marked = 0;
        for artist in state.artists.values_mut() {
            if names.contains(&artist.name) {
                artist.present = true;
                artist.last_scanned = scan_date;
            } else if artist.present {
                artist.present = false;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn non_present_album_ids(&self) -> Result<Vec<AlbumId>> {
        let state = self.state.lock().await;
        Ok(state
            .albums
            .iter()
            .filter(|(_, a)| !a.present)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn non_present_artist_ids(&self) -> Result<Vec<ArtistId>> {
        let state = self.state.lock().await;
        Ok(state
            .artists
            .iter()
            .filter(|(_, a)| !a.present)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn expunge_albums(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.albums.len();
        state.albums.retain(|_, album| album.present);
        Ok((before - state.albums.len()) as u64)
    }

    async fn expunge_artists(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.artists.len();
        state.artists.retain(|_, artist| artist.present);
        Ok((before - state.artists.len()) as u64)
    }

    async fn purge_artists(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let purged = state.artists.len() as u64;
        state.artists.clear();
        Ok(purged)
    }

    async fn present_albums(&self) -> Result<Vec<Album>> {
        let state = self.state.lock().await;
        Ok(state.albums.values().filter(|a| a.present).cloned().collect())
    }

    async fn present_artists(&self) -> Result<Vec<Artist>> {
        let state = self.state.lock().await;
        Ok(state.artists.values().filter(|a| a.present).cloned().collect())
    }

    async fn update_album_order(&self, id: AlbumId, order: i32) -> Result<()> {
        if let Some(album) = self.state.lock().await.albums.get_mut(&id) {
            album.order = order;
        }
        Ok(())
    }

    async fn update_artist_order(&self, id: ArtistId, order: i32) -> Result<()> {
        if let Some(artist) = self.state.lock().await.artists.get_mut(&id) {
            artist.order = order;
        }
        Ok(())
    }

    async fn count_unordered_albums(&self) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .albums
            .values()
            .filter(|a| a.present && a.order == UNORDERED)
            .count() as u64)
    }

    async fn count_unordered_artists(&self) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .artists
            .values()
            .filter(|a| a.present && a.order == UNORDERED)
            .count() as u64)
    }

    async fn update_album_count(&self, id: ArtistId, album_count: u32) -> Result<()> {
        if let Some(artist) = self.state.lock().await.artists.get_mut(&id) {
            artist.album_count = album_count;
        }
        Ok(())
    }

    async fn replace_genres(&self, genres: Vec<Genre>) -> Result<()> {
        self.state.lock().await.genres = genres;
        Ok(())
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.state.lock().await.genres.clone())
    }
}

#[async_trait]
impl MusicFolderRepository for MemoryCatalog {
    async fn all_folders(&self) -> Result<Vec<MusicFolder>> {
        Ok(self.state.lock().await.folders.values().cloned().collect())
    }

    async fn update_folder(&self, folder: &MusicFolder) -> Result<()> {
        self.state
            .lock()
            .await
            .folders
            .insert(folder.id, folder.clone());
        Ok(())
    }
}

#[async_trait]
impl PlaylistRepository for MemoryCatalog {
    async fn upsert_playlist(&self, mut playlist: Playlist) -> Result<Playlist> {
        let mut state = self.state.lock().await;
        let existing = state
            .playlists
            .iter()
            .find(|(_, p)| p.file_name == playlist.file_name)
            .map(|(id, _)| *id);
        let id = match existing {
            Some(id) => id,
            None => {
                state.next_playlist_id += 1;
                PlaylistId(state.next_playlist_id)
            }
        };
        playlist.id = Some(id);
        state.playlists.insert(id, playlist.clone());
        Ok(playlist)
    }

    async fn playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.state.lock().await.playlists.values().cloned().collect())
    }
}
