mod support;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use strata_core::media::PathTagReader;
use strata_core::ports::{
    AggregateRepository, IndexKind, MusicFolderRepository, TagReader, TrackTags,
};
use strata_core::{Result, ScanOutcome};
use strata_core::scan::SKIPPED;
use strata_core::settings::{AuditOptions, ScanOptions, ScannerSettings};
use strata_model::{MediaType, ScanEventType};
use support::ScanHarness;

/// Layout-derived tags plus a genre keyed on the album directory.
struct GenreByAlbum;

#[async_trait]
impl TagReader for GenreByAlbum {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        let mut tags = PathTagReader::derive(path);
        tags.genre = match tags.album.as_deref() {
            Some("Loud") => Some("Rock".into()),
            Some("Smooth") => Some("Jazz".into()),
            _ => None,
        };
        Ok(tags)
    }
}

/// Tracks under an `Other` directory carry an explicit artist sort key.
struct SortTaggedOther;

#[async_trait]
impl TagReader for SortTaggedOther {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        let mut tags = PathTagReader::derive(path);
        if path.components().any(|part| part.as_os_str() == "Other") {
            tags.artist_sort = Some("Ros, Sigur".into());
        }
        Ok(tags)
    }
}

const ORDER_STEPS: [ScanEventType; 5] = [
    ScanEventType::UpdateOrderOfAlbum,
    ScanEventType::UpdateOrderOfArtist,
    ScanEventType::UpdateOrderOfSong,
    ScanEventType::UpdateOrderOfAlbumId3,
    ScanEventType::UpdateOrderOfArtistId3,
];

#[tokio::test]
async fn fresh_scan_builds_both_strata() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 First.mp3");
    harness.add_file("Artist/Album/02 Second.mp3");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);
    assert!(report.error.is_none());

    assert_eq!(harness.non_root_of_type(MediaType::Directory).await.len(), 1);
    assert_eq!(harness.non_root_of_type(MediaType::Album).await.len(), 1);
    let songs = harness.non_root_of_type(MediaType::Music).await;
    assert_eq!(songs.len(), 2);
    assert!(songs.iter().all(|song| song.is_parsed()));

    let artists = harness.catalog.artists().await;
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].name, "Artist");
    assert_eq!(artists[0].album_count, 1);

    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].key(), ("Artist", "Album"));
    assert_eq!(albums[0].song_count, 2);

    assert_eq!(harness.phase_trace().await, ScanEventType::SEQUENCE.to_vec());
    assert_eq!(harness.last_tag().await, Some(ScanEventType::Success));
    assert_eq!(harness.index.count(IndexKind::Song).await, 2);
    assert!(!harness.index.is_session_open().await);
}

#[tokio::test]
async fn album_directory_carries_tags_of_first_track() {
    let harness = ScanHarness::new().await;
    harness.add_file("Band/Debut/02 Later.flac");
    harness.add_file("Band/Debut/01 Opener.flac");

    harness.service.run_scan().await.expect("lock free");

    let album = harness.entry("Band/Debut").await.expect("album row");
    assert_eq!(album.media_type, MediaType::Album);
    assert_eq!(album.artist.as_deref(), Some("Band"));
    assert_eq!(album.album_name.as_deref(), Some("Debut"));
    assert!(!album.children_dirty());

    let opener = harness.entry("Band/Debut/01 Opener.flac").await.expect("track");
    let later = harness.entry("Band/Debut/02 Later.flac").await.expect("track");
    assert!(opener.order < later.order);
}

#[tokio::test]
async fn removed_track_leaves_catalog_and_aggregate() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 Keep.mp3");
    harness.add_file("Artist/Album/02 Drop.mp3");
    harness.service.run_scan().await.expect("lock free");
    let dropped_id = harness
        .entry("Artist/Album/02 Drop.mp3")
        .await
        .and_then(|entry| entry.id)
        .expect("indexed track");

    harness.remove_file("Artist/Album/02 Drop.mp3");
    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    assert!(harness.entry("Artist/Album/02 Drop.mp3").await.is_none());
    assert!(!harness.index.contains(IndexKind::Song, dropped_id.get()).await);
    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].song_count, 1);
    assert!(
        harness
            .events()
            .await
            .iter()
            .all(|event| event.event_type != ScanEventType::Failed)
    );
}

#[tokio::test]
async fn unchanged_library_rescan_skips_ordering() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 First.mp3");
    harness.add_file("Artist/Album/02 Second.mp3");
    harness.service.run_scan().await.expect("lock free");

    let snapshot = |entries: Vec<strata_model::CatalogEntry>| {
        entries
            .into_iter()
            .map(|entry| (entry.path.clone(), (entry.id, entry.order, entry.parsed_at)))
            .collect::<BTreeMap<PathBuf, _>>()
    };
    let before = snapshot(harness.catalog.entries().await);

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);
    assert_eq!(snapshot(harness.catalog.entries().await), before);

    for step in ORDER_STEPS {
        assert_eq!(
            harness.comment_of(step).await.as_deref(),
            Some(SKIPPED),
            "{step} should be skipped"
        );
    }
    assert_eq!(harness.phase_trace().await, ScanEventType::SEQUENCE.to_vec());
}

#[tokio::test]
async fn aggregates_follow_tags_across_artists() {
    let harness = ScanHarness::new().await;
    harness.add_file("Zebra/Stripes/01 One.mp3");
    harness.add_file("Aardvark/Burrow/01 Dig.mp3");
    harness.add_file("Aardvark/Burrow/02 Deeper.mp3");
    harness.add_file("Aardvark/Anthill/01 March.mp3");

    harness.service.run_scan().await.expect("lock free");

    let mut artists = harness.catalog.artists().await;
    artists.sort_by_key(|artist| artist.order);
    let names: Vec<_> = artists.iter().map(|a| (a.name.as_str(), a.album_count)).collect();
    assert_eq!(names, vec![("Aardvark", 2), ("Zebra", 1)]);
    assert_eq!(artists[0].music_index, "A");
    assert_eq!(artists[1].music_index, "X-Z");

    let albums = harness.catalog.albums().await;
    let counts: BTreeMap<_, _> = albums
        .iter()
        .map(|album| ((album.artist.clone(), album.name.clone()), album.song_count))
        .collect();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts[&("Aardvark".to_string(), "Burrow".to_string())], 2);
    assert_eq!(counts[&("Aardvark".to_string(), "Anthill".to_string())], 1);
    assert_eq!(counts[&("Zebra".to_string(), "Stripes".to_string())], 1);

    let mut orders: Vec<i32> = albums.iter().map(|album| album.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(harness.index.count(IndexKind::AlbumId3).await, 3);
    assert_eq!(harness.index.count(IndexKind::ArtistId3).await, 2);
}

#[tokio::test]
async fn forced_rescans_keep_orders_stable() {
    let settings = ScannerSettings {
        scan: ScanOptions {
            ignore_file_timestamps: true,
            ..ScanOptions::default()
        },
        ..ScannerSettings::default()
    };
    let harness =
        ScanHarness::with(settings, Arc::new(PathTagReader)).await;
    harness.add_file("B Side/Two/01 x.mp3");
    harness.add_file("A Side/One/01 y.mp3");
    harness.add_file("A Side/One/02 z.mp3");

    harness.service.run_scan().await.expect("lock free");
    let orders = |entries: Vec<strata_model::CatalogEntry>| {
        entries
            .into_iter()
            .map(|entry| (entry.path, entry.order))
            .collect::<BTreeMap<_, _>>()
    };
    let first = orders(harness.catalog.entries().await);
    let album_orders = |albums: Vec<strata_model::Album>| {
        albums
            .into_iter()
            .map(|album| (album.name, album.order))
            .collect::<BTreeMap<_, _>>()
    };
    let first_albums = album_orders(harness.catalog.albums().await);

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);
    assert_eq!(orders(harness.catalog.entries().await), first);
    assert_eq!(album_orders(harness.catalog.albums().await), first_albums);
    for step in ORDER_STEPS {
        assert_ne!(harness.comment_of(step).await.as_deref(), Some(SKIPPED));
    }
}

#[tokio::test]
async fn disabled_audit_keeps_only_terminal_tag() {
    let settings = ScannerSettings {
        audit: AuditOptions {
            enabled: false,
            ..AuditOptions::default()
        },
        ..ScannerSettings::default()
    };
    let harness =
        ScanHarness::with(settings, Arc::new(PathTagReader)).await;
    harness.add_file("Artist/Album/01 Only.mp3");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let tags: Vec<_> = harness
        .events()
        .await
        .into_iter()
        .map(|event| event.event_type)
        .collect();
    assert_eq!(tags, vec![ScanEventType::Success]);
    assert_eq!(harness.service.last_phase(), Some(ScanEventType::Success));
}

#[tokio::test]
async fn videos_are_catalogued_after_the_walk() {
    let harness = ScanHarness::new().await;
    harness.add_file("Clips/intro.mkv");
    harness.add_file("Artist/Album/01 Song.mp3");

    harness.service.run_scan().await.expect("lock free");

    let videos = harness.non_root_of_type(MediaType::Video).await;
    assert_eq!(videos.len(), 1);
    assert!(videos[0].is_parsed());
    assert_eq!(support::file_name(&videos[0].path), "intro.mkv");
    let clips = harness.entry("Clips").await.expect("clips directory");
    assert_eq!(clips.media_type, MediaType::Directory);
}

#[tokio::test]
async fn cover_added_later_reaches_the_aggregates() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 First.mp3");
    harness.service.run_scan().await.expect("lock free");
    assert_eq!(harness.catalog.albums().await[0].cover_art_path, None);

    let cover = harness.add_file("Artist/Album/cover.jpg");
    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let directory = harness.entry("Artist/Album").await.expect("album row");
    assert_eq!(directory.cover_art_path.as_ref(), Some(&cover));
    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].cover_art_path.as_ref(), Some(&cover));
    let artists = harness.catalog.artists().await;
    assert_eq!(artists[0].cover_art_path.as_ref(), Some(&cover));
}

#[tokio::test]
async fn merged_sort_key_reaches_untouched_albums() {
    let harness =
        ScanHarness::with(ScannerSettings::default(), Arc::new(SortTaggedOther)).await;
    harness.add_file("Sigur Rós/Album/01 A.mp3");
    harness.service.run_scan().await.expect("lock free");
    let albums = harness.catalog.albums().await;
    assert_eq!(albums[0].artist_sort.as_deref(), Some("Sigur Ros"));

    harness.add_file("Sigur Rós/Other/01 B.mp3");
    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let track = harness
        .entry("Sigur Rós/Album/01 A.mp3")
        .await
        .expect("first track");
    assert_eq!(track.artist_sort.as_deref(), Some("Ros, Sigur"));
    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 2);
    assert!(
        albums
            .iter()
            .all(|album| album.artist_sort.as_deref() == Some("Ros, Sigur"))
    );
    let artists = harness.catalog.artists().await;
    assert_eq!(artists[0].sort_name.as_deref(), Some("Ros, Sigur"));
}

#[tokio::test]
async fn genre_master_follows_the_library() {
    let harness =
        ScanHarness::with(ScannerSettings::default(), Arc::new(GenreByAlbum)).await;
    harness.add_file("Band/Loud/01 Riff.mp3");
    harness.add_file("Band/Loud/02 Solo.mp3");
    harness.add_file("Trio/Smooth/01 Brush.mp3");
    harness.service.run_scan().await.expect("lock free");

    let genres = harness.catalog.genres().await.expect("genres");
    let counts: Vec<_> = genres
        .iter()
        .map(|genre| (genre.name.as_str(), genre.song_count, genre.album_count))
        .collect();
    assert_eq!(counts, vec![("Jazz", 1, 1), ("Rock", 2, 1)]);
    assert_eq!(harness.index.genre_names().await, vec!["Jazz", "Rock"]);

    harness.remove_file("Trio/Smooth/01 Brush.mp3");
    harness.service.run_scan().await.expect("lock free");

    let genres = harness.catalog.genres().await.expect("genres");
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0].name, "Rock");
    assert_eq!(harness.index.genre_names().await, vec!["Rock"]);
    assert_eq!(
        harness.comment_of(ScanEventType::UpdateGenreMaster).await.as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn podcast_episodes_are_parsed_after_the_walk() {
    let harness = ScanHarness::build(
        |root| ScannerSettings {
            scan: ScanOptions {
                podcast_folder: Some(root.join("Podcasts")),
                ..ScanOptions::default()
            },
            ..ScannerSettings::default()
        },
        Arc::new(PathTagReader),
        |_| {},
    )
    .await;
    harness.add_file("Podcasts/Show/episode.mp3");
    harness.add_file("Artist/Album/01 Song.mp3");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let episodes = harness.non_root_of_type(MediaType::Podcast).await;
    assert_eq!(episodes.len(), 1);
    assert!(episodes[0].is_parsed());
    assert_eq!(episodes[0].title.as_deref(), Some("episode"));
    assert_eq!(harness.non_root_of_type(MediaType::Music).await.len(), 1);
    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].name, "Album");
}

#[tokio::test]
async fn missing_folder_is_disabled_and_folders_renumbered() {
    let harness = ScanHarness::new().await;
    let gone = harness
        .catalog
        .add_folder(harness.dir.path().join("gone"), "Gone")
        .await;
    harness.add_file("Artist/Album/01 Only.mp3");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let folders = harness.catalog.all_folders().await.expect("folders");
    let orders: Vec<i32> = folders.iter().map(|folder| folder.order).collect();
    assert_eq!(orders, vec![1, 2]);
    let disabled: Vec<_> = folders.iter().filter(|folder| !folder.enabled).collect();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].id, gone.id);
    assert_eq!(harness.non_root_of_type(MediaType::Music).await.len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_directory_keeps_its_catalogued_subtree() {
    use std::fs::{self, Permissions};
    use std::os::unix::fs::PermissionsExt;

    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 Only.mp3");
    harness.service.run_scan().await.expect("lock free");

    let album_dir = harness.root.join("Artist/Album");
    fs::set_permissions(&album_dir, Permissions::from_mode(0o000)).expect("chmod");
    if fs::read_dir(&album_dir).is_ok() {
        // Privileged users read through the mode bits.
        fs::set_permissions(&album_dir, Permissions::from_mode(0o755)).expect("chmod");
        return;
    }
    let report = harness.service.run_scan().await;
    fs::set_permissions(&album_dir, Permissions::from_mode(0o755)).expect("chmod");

    let report = report.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);
    let track = harness
        .entry("Artist/Album/01 Only.mp3")
        .await
        .expect("track kept");
    assert!(track.present);
    let albums = harness.catalog.albums().await;
    assert_eq!(albums.len(), 1);
    assert!(albums[0].present);
    assert_eq!(albums[0].song_count, 1);
}
