use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, ScanError};
use crate::ports::{TagReader, TrackTags};

/// Reads embedded tags and stream properties with `lofty`. The blocking
/// probe runs on the blocking pool.
#[cfg(feature = "lofty")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

#[cfg(feature = "lofty")]
impl LoftyTagReader {
    fn read_blocking(path: &Path) -> Result<TrackTags> {
        use lofty::prelude::*;
        use lofty::probe::Probe;
        use lofty::tag::ItemKey;

        let tag_error = |err: lofty::error::LoftyError| ScanError::Tag {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let tagged_file = Probe::open(path)
            .map_err(tag_error)?
            .read()
            .map_err(tag_error)?;

        let properties = tagged_file.properties();
        let mut tags = TrackTags {
            duration_seconds: u32::try_from(properties.duration().as_secs()).ok(),
            bit_rate: properties.audio_bitrate(),
            ..TrackTags::default()
        };

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            tracing::debug!(target: "scan::tags", path = %path.display(), "no embedded tags");
            return Ok(tags.or_path_derived(path));
        };

        let text = |key: &ItemKey| tag.get_string(key).map(str::to_string);
        tags.title = tag.title().map(|s| s.to_string());
        tags.artist = tag.artist().map(|s| s.to_string());
        tags.album = tag.album().map(|s| s.to_string());
        tags.genre = tag.genre().map(|s| s.to_string());
        tags.album_artist = text(&ItemKey::AlbumArtist);
        tags.composer = text(&ItemKey::Composer);
        tags.artist_sort = text(&ItemKey::TrackArtistSortOrder);
        tags.album_artist_sort = text(&ItemKey::AlbumArtistSortOrder);
        tags.album_sort = text(&ItemKey::AlbumTitleSortOrder);
        tags.composer_sort = text(&ItemKey::ComposerSortOrder);
        tags.track_number = tag.track();
        tags.disc_number = tag.disk();
        tags.year = tag.year().and_then(|year| i32::try_from(year).ok());
        Ok(tags.or_path_derived(path))
    }
}

#[cfg(feature = "lofty")]
#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_blocking(&owned))
            .await
            .map_err(|err| ScanError::Internal(format!("tag reader task failed: {err}")))?
    }
}

/// Derives tags from the conventional `Artist/Album/NN Title.ext` layout.
/// Used when no tag library is compiled in, and as a fallback for files
/// whose tags cannot be read.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTagReader;

impl PathTagReader {
    /// Tags read off the `Artist/Album/NN Title.ext` layout.
    pub fn derive(path: &Path) -> TrackTags {
        let component = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        };
        let album_dir = path.parent();
        let artist_dir = album_dir.and_then(Path::parent);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (track_number, title) = match stem.split_once(' ') {
            Some((number, rest)) => match number.trim_end_matches(['.', '-']).parse::<u32>() {
                Ok(n) => (Some(n), rest.trim_start_matches(['-', ' ']).to_string()),
                Err(_) => (None, stem.clone()),
            },
            None => (None, stem.clone()),
        };

        TrackTags {
            title: Some(title),
            artist: component(artist_dir),
            album: component(album_dir),
            track_number,
            ..TrackTags::default()
        }
    }
}

impl TrackTags {
    /// Fill a missing title, artist or album from the directory layout.
    pub fn or_path_derived(mut self, path: &Path) -> Self {
        let derived = PathTagReader::derive(path);
        let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
        if blank(&self.title) {
            self.title = derived.title;
            self.track_number = self.track_number.or(derived.track_number);
        }
        if blank(&self.artist) && blank(&self.album_artist) {
            self.artist = derived.artist;
        }
        if blank(&self.album) {
            self.album = derived.album;
        }
        self
    }
}

#[async_trait]
impl TagReader for PathTagReader {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        Ok(Self::derive(path))
    }
}

/// Reader compiled in by default.
#[cfg(feature = "lofty")]
pub type DefaultTagReader = LoftyTagReader;
/// Tag reader chosen by the enabled features.
#[cfg(not(feature = "lofty"))]
pub type DefaultTagReader = PathTagReader;
